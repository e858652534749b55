//! Debounce through the full interrupt handoff: the "ISR" only records an
//! edge and raises a wake flag; gestures are delivered by the scheduler pass.

#![allow(clippy::unwrap_used)]

use embassy_time::Instant;
use firmware::input::{Button, Direction, EdgeLatch, InputBuilder, InputSource, IsrHandoff};
use firmware::scheduler::{Scheduler, SlotId, WakeFlags};
use platform::mocks::{MockLine, MockPin, RecordingHandler};
use platform::{InputEvent, PinState, WiringType};

fn ms(v: u64) -> Instant {
    Instant::from_millis(v)
}

/// One main-loop pass over a single input slot.
fn pass(
    scheduler: &mut Scheduler,
    wake: &WakeFlags,
    source: &mut dyn InputSource,
    handler: &mut RecordingHandler,
    now: u64,
) -> usize {
    scheduler.absorb(wake, ms(now));
    scheduler.run_due(ms(now), |_| source.service(ms(now), &mut *handler))
}

/// Press at `down`, release at `up`, with a main-loop pass at every poll
/// period in between.
fn joystick_cycle(down: u64, up: u64) -> Vec<InputEvent> {
    let latch = EdgeLatch::new();
    let wake = WakeFlags::new();
    let mut scheduler: Scheduler = Scheduler::new();
    let slot = scheduler.add("joystick").unwrap();
    let isr = IsrHandoff::new(&latch, &wake, slot);

    let center = MockLine::new(PinState::High);
    let mut js = InputBuilder::joystick()
        .wiring(WiringType::ActiveLowPullup)
        .debounce_ms(50)
        .build_joystick::<MockPin<'_>>(&latch);
    js.set_pin(Direction::Center, center.pin());
    js.set_handler(Direction::Center, InputEvent::ButtonShort);
    js.start().unwrap();

    let mut handler = RecordingHandler::new();

    center.set_level(PinState::Low);
    isr.edge(Direction::Center.line(), PinState::Low, ms(down));
    assert!(wake.any());

    let mut now = down;
    while now < up {
        pass(&mut scheduler, &wake, &mut js, &mut handler, now);
        assert!(handler.events().is_empty(), "delivered while held");
        now += 10;
    }
    center.set_level(PinState::High);
    pass(&mut scheduler, &wake, &mut js, &mut handler, up);
    assert!(!scheduler.is_enabled(slot));
    handler.events().to_vec()
}

#[test]
fn joystick_bounce_is_discarded() {
    assert!(joystick_cycle(0, 30).is_empty());
}

#[test]
fn joystick_press_at_threshold_fires_once() {
    assert_eq!(joystick_cycle(0, 50), [InputEvent::ButtonShort]);
}

#[test]
fn joystick_long_hold_still_fires_once() {
    assert_eq!(joystick_cycle(100, 420), [InputEvent::ButtonShort]);
}

/// Main button press at `down`, release at `up`; one pass per edge.
fn main_button_cycle(down: u64, up: u64) -> Vec<InputEvent> {
    let latch = EdgeLatch::new();
    let wake = WakeFlags::new();
    let mut scheduler: Scheduler = Scheduler::new();
    let slot: SlotId = scheduler.add("buttons").unwrap();
    let isr = IsrHandoff::new(&latch, &wake, slot);

    let main = MockLine::new(PinState::Low);
    let mut buttons = InputBuilder::two_button()
        .wiring(WiringType::ActiveHighPulldown)
        .debounce_ms(50)
        .long_press_ms(500)
        .build_two_button::<MockPin<'_>>(&latch);
    buttons.set_pin(Button::Main, main.pin());
    buttons.start().unwrap();

    let mut handler = RecordingHandler::new();

    main.set_level(PinState::High);
    isr.edge(Button::Main.line(), PinState::High, ms(down));
    assert_eq!(pass(&mut scheduler, &wake, &mut buttons, &mut handler, down), 1);

    main.set_level(PinState::Low);
    isr.edge(Button::Main.line(), PinState::Low, ms(up));
    pass(&mut scheduler, &wake, &mut buttons, &mut handler, up);
    handler.events().to_vec()
}

#[test]
fn two_button_bounce_is_discarded() {
    assert!(main_button_cycle(0, 49).is_empty());
}

#[test]
fn two_button_press_at_threshold_fires_once() {
    assert_eq!(main_button_cycle(0, 50), [InputEvent::ButtonShort]);
}

#[test]
fn two_button_chatter_then_clean_press() {
    let latch = EdgeLatch::new();
    let wake = WakeFlags::new();
    let mut scheduler: Scheduler = Scheduler::new();
    let slot = scheduler.add("buttons").unwrap();
    let isr = IsrHandoff::new(&latch, &wake, slot);

    let main = MockLine::new(PinState::High);
    let mut buttons = InputBuilder::two_button()
        .wiring(WiringType::ActiveLow)
        .build_two_button::<MockPin<'_>>(&latch);
    buttons.set_pin(Button::Main, main.pin());
    buttons.start().unwrap();
    let mut handler = RecordingHandler::new();

    // Contact chatter recorded before the main loop gets a chance to run.
    for (at, level) in [(0, PinState::Low), (3, PinState::High), (6, PinState::Low), (9, PinState::High)] {
        isr.edge(Button::Main.line(), level, ms(at));
    }
    pass(&mut scheduler, &wake, &mut buttons, &mut handler, 10);
    assert!(handler.events().is_empty());

    main.set_level(PinState::Low);
    isr.edge(Button::Main.line(), PinState::Low, ms(200));
    pass(&mut scheduler, &wake, &mut buttons, &mut handler, 200);
    main.set_level(PinState::High);
    isr.edge(Button::Main.line(), PinState::High, ms(320));
    pass(&mut scheduler, &wake, &mut buttons, &mut handler, 320);
    assert_eq!(handler.events(), [InputEvent::ButtonShort]);
}
