//! Headless device run on the desktop.
//!
//! Drives the full main loop against the mock panel: boot, a couple of mesh
//! events, button gestures through the interrupt handoff, and a sleep cycle.
//! The final frame is printed as ASCII art.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p firmware --example headless --features demo
//! ```

#![allow(clippy::print_stdout, clippy::unwrap_used, clippy::expect_used)]

use firmware::input::{Button, EdgeLatch, InputBuilder, IsrHandoff};
use firmware::{CommandQueue, Device, DisplayCommand, WakeFlags};
use inkhud::applets::{HeardApplet, RecentMessageApplet};
use inkhud::{Event, FontSet, NodeHeard, Settings, TextMessage, WindowManager};
use platform::mocks::{MemoryStore, MockClock, MockDisplay, MockLine, MockPin, MockRtc};
use platform::{image_len, Clock, PinState, WiringType};
use tracing_subscriber::EnvFilter;

const W: u32 = 250;
const H: u32 = 122;
/// 2024-11-01T12:00:00Z
const BOOT_EPOCH: u32 = 1_730_462_400;

type Demo<'a> = Device<'a, MockDisplay, MemoryStore, &'a MockClock, &'a MockRtc>;

fn run_for(device: &mut Demo<'_>, clock: &MockClock, ms: u64) {
    let limit = clock.now().as_millis().saturating_add(ms);
    while let Some(at) = device.tick().expect("device tick") {
        if at.as_millis() > limit {
            break;
        }
        if let Some(gap) = at.checked_duration_since(clock.now()) {
            clock.advance(gap);
        }
    }
    let now = clock.now().as_millis();
    clock.advance_ms(limit.saturating_sub(now));
}

fn tap(isr: &IsrHandoff<'_>, line: &MockLine, button: Button, clock: &MockClock, device: &mut Demo<'_>, hold_ms: u64) {
    line.set_level(PinState::Low);
    isr.edge(button.line(), PinState::Low, clock.now());
    run_for(device, clock, hold_ms);
    line.set_level(PinState::High);
    isr.edge(button.line(), PinState::High, clock.now());
    run_for(device, clock, 3_000);
}

fn print_frame(display: &MockDisplay) {
    // Two rows per character keeps the aspect ratio roughly square.
    for y in (0..H).step_by(4) {
        let row: String = (0..W)
            .step_by(2)
            .map(|x| if display.is_black(x, y) || display.is_black(x, y + 1) { '#' } else { ' ' })
            .collect();
        println!("|{}|", row.trim_end());
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let clock = MockClock::new(0);
    let rtc = MockRtc::new(Some(BOOT_EPOCH));
    let wake = WakeFlags::new();
    let commands: CommandQueue = CommandQueue::new();
    let latch = EdgeLatch::new();
    let main_line = MockLine::new(PinState::High);
    let aux_line = MockLine::new(PinState::High);

    let mut buttons = InputBuilder::two_button()
        .wiring(WiringType::ActiveLowPullup)
        .build_two_button::<MockPin<'_>>(&latch);
    buttons.set_pin(Button::Main, main_line.pin());
    buttons.set_pin(Button::Aux, aux_line.pin());

    let mut store = MemoryStore::new();
    let mut settings = Settings::load_or_default(&mut store);
    settings.user_tiles.count = 2;

    let mut buf = vec![0u8; image_len(W, H)];
    let mut recent = RecentMessageApplet::new();
    let mut heard = HeardApplet::new();
    let display = MockDisplay::new(W, H).with_busy_polls(3);
    let mut wm = WindowManager::new(display, &mut buf, settings, FontSet::default()).expect("window manager");
    wm.add_applet(&mut recent, true).expect("register");
    wm.add_applet(&mut heard, true).expect("register");

    let mut device = Device::new(wm, &wake, &commands, store, &clock, &rtc).expect("device");
    let slot = device.add_input(&mut buttons).expect("input slot");
    let isr = IsrHandoff::new(&latch, &wake, slot);

    device.begin().expect("begin");
    run_for(&mut device, &clock, 1_000);

    let now = clock.now();
    device.window_manager_mut().publish(
        &Event::NodeHeard(NodeHeard {
            node: 0x1a2b_3c4d,
            short_name: Some("ALFA"),
            snr: 6.5,
            rssi: -92.0,
            hops_away: Some(0),
            last_heard: BOOT_EPOCH,
        }),
        now,
    );
    device.window_manager_mut().publish(
        &Event::TextMessage(TextMessage {
            from: 0x1a2b_3c4d,
            sender_name: Some("ALFA"),
            text: "Meet at the north trailhead at noon, bring the spare radio",
            channel: 0,
            timestamp: BOOT_EPOCH,
            is_dm: false,
            snr: 6.5,
            rssi: -92.0,
        }),
        now,
    );
    commands.post(DisplayCommand::NewData { source: 1 }).expect("post");
    run_for(&mut device, &clock, 5_000);

    tap(&isr, &aux_line, Button::Aux, &clock, &mut device, 80);
    tap(&isr, &main_line, Button::Main, &clock, &mut device, 120);

    commands.post(DisplayCommand::PrepareSleep).expect("post");
    run_for(&mut device, &clock, 10);
    commands.post(DisplayCommand::Wake).expect("post");
    run_for(&mut device, &clock, 5_000);

    let panel = device.window_manager().driver();
    tracing::info!(
        updates = panel.update_count(),
        black = panel.black_pixels(),
        "demo finished"
    );
    print_frame(panel);
}
