//! Five-way joystick, edge-triggered.
//!
//! Each direction is a separate line. The press edge is the only interrupt;
//! once a press is latched the source polls every [`RELEASE_POLL`] for the
//! line to come back. On release the held time is compared with the
//! debounce threshold and the bound event is delivered. Presses arriving
//! while a release is being polled are bounce and are ignored.

use embassy_time::{Duration, Instant};
use platform::{InputEvent, InputHandler, InterruptPin, WiringType};

use super::{EdgeLatch, InputError, InputSource, RELEASE_POLL};
use crate::scheduler::Step;

/// Joystick line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Up
    Up,
    /// Right
    Right,
    /// Down
    Down,
    /// Left
    Left,
    /// Centre press
    Center,
}

impl Direction {
    /// Every direction in line order.
    pub const ALL: [Self; 5] = [Self::Up, Self::Right, Self::Down, Self::Left, Self::Center];

    /// Line index used in [`Edge`](super::Edge) records.
    pub const fn line(self) -> u8 {
        self as u8
    }

    /// Direction for a line index.
    pub fn from_line(line: u8) -> Option<Self> {
        Self::ALL.get(usize::from(line)).copied()
    }
}

/// Edge-triggered joystick input source.
pub struct Joystick<'a, P: InterruptPin> {
    latch: &'a EdgeLatch,
    wiring: WiringType,
    debounce: Duration,
    pins: [Option<P>; 5],
    bindings: [Option<InputEvent>; 5],
    pressed: Option<(Direction, Instant)>,
}

impl<'a, P: InterruptPin> Joystick<'a, P> {
    /// Joystick with no lines, reading interrupts from `latch`.
    pub fn new(latch: &'a EdgeLatch, wiring: WiringType, debounce: Duration) -> Self {
        Self {
            latch,
            wiring,
            debounce,
            pins: [None, None, None, None, None],
            bindings: [None; 5],
            pressed: None,
        }
    }

    /// Assign the line for `direction`.
    pub fn set_pin(&mut self, direction: Direction, pin: P) {
        if let Some(slot) = self.pins.get_mut(usize::from(direction.line())) {
            *slot = Some(pin);
        }
    }

    /// Event delivered when `direction` is pressed and released.
    pub fn set_handler(&mut self, direction: Direction, event: InputEvent) {
        if let Some(slot) = self.bindings.get_mut(usize::from(direction.line())) {
            *slot = Some(event);
        }
    }

    /// Change the debounce threshold.
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Change the wiring. Takes effect at the next `start`.
    pub fn set_wiring(&mut self, wiring: WiringType) {
        self.wiring = wiring;
    }

    /// Configured wiring
    pub fn wiring(&self) -> WiringType {
        self.wiring
    }

    /// Direction currently being polled for release.
    pub fn polling(&self) -> Option<Direction> {
        self.pressed.map(|(d, _)| d)
    }

    fn is_pressed(&mut self, direction: Direction) -> bool {
        let wiring = self.wiring;
        self.pins
            .get_mut(usize::from(direction.line()))
            .and_then(Option::as_mut)
            .and_then(|pin| pin.level().ok())
            .is_some_and(|level| wiring.is_pressed(level))
    }
}

impl<P: InterruptPin> InputSource for Joystick<'_, P> {
    fn start(&mut self) -> Result<(), InputError> {
        let edge = self.wiring.press_edge();
        let pull = self.wiring.pull();
        let mut attached = 0u8;
        for pin in self.pins.iter_mut().flatten() {
            pin.set_pull(pull).map_err(|_| InputError::Pin)?;
            pin.enable_interrupt(edge).map_err(|_| InputError::Pin)?;
            attached = attached.saturating_add(1);
        }
        if attached == 0 {
            return Err(InputError::NoLines);
        }
        debug!("joystick started, {} lines", attached);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), InputError> {
        for pin in self.pins.iter_mut().flatten() {
            pin.disable_interrupt().map_err(|_| InputError::Pin)?;
        }
        self.pressed = None;
        self.latch.clear();
        debug!("joystick stopped");
        Ok(())
    }

    fn service(&mut self, now: Instant, handler: &mut dyn InputHandler) -> Step {
        while let Some(edge) = self.latch.pop() {
            if self.pressed.is_some() {
                continue;
            }
            if let Some(direction) = Direction::from_line(edge.line) {
                self.pressed = Some((direction, edge.at));
            }
        }

        let Some((direction, pressed_at)) = self.pressed else {
            return Step::Disable;
        };
        if self.is_pressed(direction) {
            return Step::RunAgainIn(RELEASE_POLL);
        }

        self.pressed = None;
        let held = now
            .checked_duration_since(pressed_at)
            .unwrap_or(Duration::from_ticks(0));
        if held < self.debounce {
            trace!("joystick press of {} ms discarded", held.as_millis());
            return Step::Disable;
        }
        if let Some(event) = self.bindings.get(usize::from(direction.line())).copied().flatten() {
            handler.handle_input(event);
        }
        Step::Disable
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::{MockLine, RecordingHandler};
    use platform::{InterruptMode, PinState, Pull};

    use crate::input::Edge;

    fn ms(v: u64) -> Instant {
        Instant::from_millis(v)
    }

    #[test]
    fn test_direction_lines_round_trip() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_line(d.line()), Some(d));
        }
        assert_eq!(Direction::from_line(5), None);
    }

    #[test]
    fn test_start_applies_wiring() {
        let latch = EdgeLatch::new();
        let up = MockLine::new(PinState::High);
        let mut js = Joystick::new(&latch, WiringType::ActiveLowPullup, Duration::from_millis(50));
        js.set_pin(Direction::Up, up.pin());
        js.start().unwrap();
        assert_eq!(up.interrupt(), Some(InterruptMode::FallingEdge));
        assert_eq!(up.pull(), Pull::Up);
        js.stop().unwrap();
        assert_eq!(up.interrupt(), None);
        // Restart restores the same configuration.
        js.start().unwrap();
        assert_eq!(up.interrupt(), Some(InterruptMode::FallingEdge));
    }

    #[test]
    fn test_start_without_lines_fails() {
        let latch = EdgeLatch::new();
        let mut js: Joystick<'_, platform::mocks::MockPin<'_>> =
            Joystick::new(&latch, WiringType::ActiveLow, Duration::from_millis(50));
        assert_eq!(js.start(), Err(InputError::NoLines));
    }

    #[test]
    fn test_bounce_while_polling_is_ignored() {
        let latch = EdgeLatch::new();
        let down = MockLine::new(PinState::Low);
        let mut handler = RecordingHandler::new();
        let mut js = Joystick::new(&latch, WiringType::ActiveLow, Duration::from_millis(50));
        js.set_pin(Direction::Down, down.pin());
        js.set_handler(Direction::Down, InputEvent::ButtonShort);

        latch.record(Edge::new(Direction::Down.line(), PinState::Low, ms(0)));
        assert_eq!(js.service(ms(0), &mut handler), Step::RunAgainIn(RELEASE_POLL));
        latch.record(Edge::new(Direction::Down.line(), PinState::Low, ms(30)));
        assert_eq!(js.service(ms(30), &mut handler), Step::RunAgainIn(RELEASE_POLL));

        down.set_level(PinState::High);
        assert_eq!(js.service(ms(80), &mut handler), Step::Disable);
        // Held from the first edge, not the bounce.
        assert_eq!(handler.events(), [InputEvent::ButtonShort]);
    }
}
