//! Device main loop against the mock panel, mock lines and a manual clock.

#![allow(clippy::unwrap_used, clippy::panic)]

use firmware::input::{Button, EdgeLatch, InputBuilder, IsrHandoff};
use firmware::{input_slot, CommandQueue, Device, DisplayCommand, EnqueueError, WakeFlags};
use inkhud::applets::{HeardApplet, RecentMessageApplet};
use inkhud::{FontSet, Settings, WindowManager};
use platform::mocks::{MemoryStore, MockClock, MockDisplay, MockLine, MockPin, MockRtc};
use platform::{image_len, Clock, InterruptMode, PinState, Pull, UpdateType, WiringType};

const W: u32 = 250;
const H: u32 = 122;

type TestDevice<'a> = Device<'a, MockDisplay, MemoryStore, &'a MockClock, &'a MockRtc>;

/// Handles a test keeps while the device owns everything else.
struct Rig<'r> {
    clock: &'r MockClock,
    main: &'r MockLine,
    aux: &'r MockLine,
    isr: IsrHandoff<'r>,
    commands: &'r CommandQueue,
}

impl Rig<'_> {
    fn press(&self, button: Button) {
        let line = match button {
            Button::Main => self.main,
            Button::Aux => self.aux,
        };
        line.set_level(PinState::Low);
        self.isr.edge(button.line(), PinState::Low, self.clock.now());
    }

    fn release(&self, button: Button) {
        let line = match button {
            Button::Main => self.main,
            Button::Aux => self.aux,
        };
        line.set_level(PinState::High);
        self.isr.edge(button.line(), PinState::High, self.clock.now());
    }
}

fn with_device(f: impl FnOnce(&mut TestDevice<'_>, &Rig<'_>)) {
    let clock = MockClock::new(0);
    let rtc = MockRtc::new(None);
    let wake = WakeFlags::new();
    let commands: CommandQueue = CommandQueue::new();
    let latch = EdgeLatch::new();
    let main = MockLine::new(PinState::High);
    let aux = MockLine::new(PinState::High);

    let mut buttons = InputBuilder::two_button()
        .wiring(WiringType::ActiveLowPullup)
        .build_two_button::<MockPin<'_>>(&latch);
    buttons.set_pin(Button::Main, main.pin());
    buttons.set_pin(Button::Aux, aux.pin());

    let mut store = MemoryStore::new();
    let settings = Settings::load_or_default(&mut store);
    let mut buf = vec![0u8; image_len(W, H)];
    let mut recent = RecentMessageApplet::new();
    let mut heard = HeardApplet::new();

    let display = MockDisplay::new(W, H).with_busy_polls(2);
    let mut wm = WindowManager::new(display, &mut buf, settings, FontSet::default()).unwrap();
    wm.add_applet(&mut recent, true).unwrap();
    wm.add_applet(&mut heard, false).unwrap();

    let mut device = Device::new(wm, &wake, &commands, store, &clock, &rtc).unwrap();
    let slot = device.add_input(&mut buttons).unwrap();
    assert_eq!(slot, input_slot(0));

    let rig = Rig {
        clock: &clock,
        main: &main,
        aux: &aux,
        isr: IsrHandoff::new(&latch, &wake, slot),
        commands: &commands,
    };
    f(&mut device, &rig);
}

/// Tick, jumping the clock to each requested wake-up, until nothing is due
/// within `horizon_ms`.
fn settle(device: &mut TestDevice<'_>, clock: &MockClock, horizon_ms: u64) {
    let limit = clock.now().as_millis() + horizon_ms;
    for _ in 0..500 {
        let Some(at) = device.tick().unwrap() else {
            return;
        };
        if at.as_millis() > limit {
            return;
        }
        if let Some(gap) = at.checked_duration_since(clock.now()) {
            clock.advance(gap);
        }
    }
    panic!("device never settled");
}

fn updates(device: &TestDevice<'_>) -> Vec<UpdateType> {
    device.window_manager().driver().updates().to_vec()
}

#[test]
fn begin_attaches_display_and_inputs() {
    with_device(|device, rig| {
        assert_eq!(
            rig.commands.post(DisplayCommand::Wake),
            Err(EnqueueError::DisplayUnused)
        );

        device.begin().unwrap();
        assert!(rig.commands.is_attached());
        assert_eq!(rig.main.interrupt(), Some(InterruptMode::BothEdges));
        assert_eq!(rig.aux.pull(), Pull::Up);
        assert_eq!(updates(device), [UpdateType::Full]);

        settle(device, rig.clock, 10_000);
        assert_eq!(updates(device), [UpdateType::Full]);
    });
}

#[test]
fn held_main_button_opens_the_menu() {
    with_device(|device, rig| {
        device.begin().unwrap();
        rig.press(Button::Main);
        settle(device, rig.clock, 400);
        assert!(!device.window_manager().menu_open());

        // The long press is recognised while the button is still down.
        settle(device, rig.clock, 10_000);
        assert!(device.window_manager().menu_open());
        assert_eq!(updates(device).len(), 2);

        rig.release(Button::Main);
        settle(device, rig.clock, 10_000);
        assert!(device.window_manager().menu_open());
        assert_eq!(device.window_manager().driver().overlaps(), 0);
    });
}

#[test]
fn aux_hold_forces_a_full_refresh() {
    with_device(|device, rig| {
        device.begin().unwrap();
        rig.press(Button::Aux);
        settle(device, rig.clock, 100);
        rig.clock.advance_ms(600);
        rig.release(Button::Aux);
        settle(device, rig.clock, 10_000);
        assert_eq!(updates(device), [UpdateType::Full, UpdateType::Full]);
    });
}

#[test]
fn queued_refresh_command_runs_once() {
    with_device(|device, rig| {
        device.begin().unwrap();
        rig.commands.post(DisplayCommand::Refresh(UpdateType::Fast)).unwrap();
        rig.commands.post(DisplayCommand::NewData { source: 3 }).unwrap();
        settle(device, rig.clock, 10_000);
        assert_eq!(updates(device), [UpdateType::Full, UpdateType::Fast]);
        assert!(rig.commands.is_empty());
    });
}

#[test]
fn sleep_detaches_inputs_and_saves_settings() {
    with_device(|device, rig| {
        device.begin().unwrap();

        // Aux tap moves the focus, which dirties the settings.
        rig.press(Button::Aux);
        settle(device, rig.clock, 50);
        rig.clock.advance_ms(100);
        rig.release(Button::Aux);
        settle(device, rig.clock, 50);
        assert!(device.window_manager().settings_dirty());

        rig.commands.post(DisplayCommand::PrepareSleep).unwrap();
        device.tick().unwrap();
        assert!(device.is_asleep());
        assert_eq!(rig.main.interrupt(), None);
        assert_eq!(rig.aux.interrupt(), None);
        assert_eq!(device.store().writes(), 1);
        assert!(!device.window_manager().settings_dirty());

        rig.commands.post(DisplayCommand::Wake).unwrap();
        device.tick().unwrap();
        assert!(!device.is_asleep());
        assert_eq!(rig.main.interrupt(), Some(InterruptMode::BothEdges));
        assert_eq!(rig.main.pull(), Pull::Up);
    });
}

#[test]
fn settings_saved_before_sleep_survive_a_restart() {
    let mut saved = MemoryStore::new();
    let mut live = Settings::default();
    with_device(|device, rig| {
        device.begin().unwrap();
        rig.press(Button::Aux);
        settle(device, rig.clock, 50);
        rig.clock.advance_ms(100);
        rig.release(Button::Aux);
        settle(device, rig.clock, 50);
        device.before_light_sleep().unwrap();
        live = *device.window_manager().settings();
        saved = MemoryStore::with_blob(device.store().blob().unwrap());
    });
    let reloaded = Settings::load_or_default(&mut saved);
    assert_eq!(reloaded, live);
    assert_eq!(reloaded.user_tiles.displayed[0], Some(0));
}
