//! Main + auxiliary button pair, change-triggered.
//!
//! Both lines interrupt on every edge and the handler records the level it
//! read. Servicing classifies the records:
//!
//! - main: a press is time-stamped; a release at least the debounce
//!   threshold later is a short press. Still held at the long-press
//!   threshold, it is a long press and the release is swallowed.
//! - aux: the press is reported as [`InputEvent::AuxDown`] straight away;
//!   the release as [`InputEvent::AuxUp`] once the press has lasted the
//!   debounce threshold. An early release edge is re-checked against the
//!   line when the threshold expires.
//!
//! The only timed wake-ups are the long-press check and that re-check.

use embassy_time::{Duration, Instant};
use platform::{InputEvent, InputHandler, InterruptMode, InterruptPin, WiringType};

use super::{EdgeLatch, InputError, InputSource};
use crate::scheduler::Step;

/// Button line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Short / long press navigation
    Main,
    /// Down / up gestures
    Aux,
}

impl Button {
    /// Line index used in [`Edge`](super::Edge) records.
    pub const fn line(self) -> u8 {
        match self {
            Self::Main => 0,
            Self::Aux => 1,
        }
    }

    /// Button for a line index.
    pub fn from_line(line: u8) -> Option<Self> {
        match line {
            0 => Some(Self::Main),
            1 => Some(Self::Aux),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MainState {
    pressed_at: Option<Instant>,
    long_sent: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct AuxState {
    pressed_at: Option<Instant>,
    recheck_at: Option<Instant>,
}

/// Change-triggered two-button input source.
pub struct TwoButton<'a, P: InterruptPin> {
    latch: &'a EdgeLatch,
    wiring: WiringType,
    debounce: Duration,
    long_press: Duration,
    main: Option<P>,
    aux: Option<P>,
    main_state: MainState,
    aux_state: AuxState,
}

impl<'a, P: InterruptPin> TwoButton<'a, P> {
    /// Button pair with no lines, reading interrupts from `latch`.
    pub fn new(latch: &'a EdgeLatch, wiring: WiringType, debounce: Duration, long_press: Duration) -> Self {
        Self {
            latch,
            wiring,
            debounce,
            long_press,
            main: None,
            aux: None,
            main_state: MainState::default(),
            aux_state: AuxState::default(),
        }
    }

    /// Assign the line for `button`.
    pub fn set_pin(&mut self, button: Button, pin: P) {
        match button {
            Button::Main => self.main = Some(pin),
            Button::Aux => self.aux = Some(pin),
        }
    }

    /// Change the debounce threshold.
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Change the long-press threshold.
    pub fn set_long_press(&mut self, long_press: Duration) {
        self.long_press = long_press;
    }

    /// `true` between an aux down and its up.
    pub fn aux_held(&self) -> bool {
        self.aux_state.pressed_at.is_some()
    }

    fn line_pressed(&mut self, button: Button) -> bool {
        let wiring = self.wiring;
        let pin = match button {
            Button::Main => self.main.as_mut(),
            Button::Aux => self.aux.as_mut(),
        };
        pin.and_then(|p| p.level().ok())
            .is_some_and(|level| wiring.is_pressed(level))
    }

    fn held(&self, since: Instant, until: Instant) -> Duration {
        until
            .checked_duration_since(since)
            .unwrap_or(Duration::from_ticks(0))
    }

    fn main_edge(&mut self, pressed: bool, at: Instant, handler: &mut dyn InputHandler) {
        if pressed {
            if self.main_state.pressed_at.is_none() {
                self.main_state = MainState {
                    pressed_at: Some(at),
                    long_sent: false,
                };
            }
            return;
        }
        let Some(since) = self.main_state.pressed_at.take() else {
            return;
        };
        if self.main_state.long_sent {
            return;
        }
        let held = self.held(since, at);
        if held < self.debounce {
            trace!("main press of {} ms discarded", held.as_millis());
        } else if held >= self.long_press {
            // Released past the threshold before the check ran.
            handler.handle_input(InputEvent::ButtonLong);
        } else {
            handler.handle_input(InputEvent::ButtonShort);
        }
    }

    fn aux_edge(&mut self, pressed: bool, at: Instant, handler: &mut dyn InputHandler) {
        match (pressed, self.aux_state.pressed_at) {
            (true, None) => {
                self.aux_state = AuxState {
                    pressed_at: Some(at),
                    recheck_at: None,
                };
                handler.handle_input(InputEvent::AuxDown);
            }
            (false, Some(since)) => {
                if self.held(since, at) >= self.debounce {
                    self.aux_state = AuxState::default();
                    handler.handle_input(InputEvent::AuxUp);
                } else {
                    trace!("aux release bounce");
                    self.aux_state.recheck_at = since.checked_add(self.debounce);
                }
            }
            _ => {}
        }
    }

    fn timed_checks(&mut self, now: Instant, handler: &mut dyn InputHandler) {
        if let (Some(since), false) = (self.main_state.pressed_at, self.main_state.long_sent) {
            if self.held(since, now) >= self.long_press {
                if self.line_pressed(Button::Main) {
                    self.main_state.long_sent = true;
                    handler.handle_input(InputEvent::ButtonLong);
                } else {
                    // Release edge lost; treat as nothing.
                    self.main_state = MainState::default();
                }
            }
        }

        if let Some(at) = self.aux_state.recheck_at {
            if now >= at {
                self.aux_state.recheck_at = None;
                if !self.line_pressed(Button::Aux) {
                    self.aux_state = AuxState::default();
                    handler.handle_input(InputEvent::AuxUp);
                }
            }
        }
    }

    fn next_step(&self, now: Instant) -> Step {
        let long = match self.main_state {
            MainState {
                pressed_at: Some(since),
                long_sent: false,
            } => since.checked_add(self.long_press),
            _ => None,
        };
        let deadline = match (long, self.aux_state.recheck_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match deadline {
            Some(at) => Step::RunAgainIn(at.checked_duration_since(now).unwrap_or(Duration::from_ticks(0))),
            None => Step::Disable,
        }
    }
}

impl<P: InterruptPin> InputSource for TwoButton<'_, P> {
    fn start(&mut self) -> Result<(), InputError> {
        if self.main.is_none() && self.aux.is_none() {
            return Err(InputError::NoLines);
        }
        let pull = self.wiring.pull();
        for pin in [self.main.as_mut(), self.aux.as_mut()].into_iter().flatten() {
            pin.set_pull(pull).map_err(|_| InputError::Pin)?;
            pin.enable_interrupt(InterruptMode::BothEdges)
                .map_err(|_| InputError::Pin)?;
        }
        debug!("two-button input started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), InputError> {
        for pin in [self.main.as_mut(), self.aux.as_mut()].into_iter().flatten() {
            pin.disable_interrupt().map_err(|_| InputError::Pin)?;
        }
        self.main_state = MainState::default();
        self.aux_state = AuxState::default();
        self.latch.clear();
        debug!("two-button input stopped");
        Ok(())
    }

    fn service(&mut self, now: Instant, handler: &mut dyn InputHandler) -> Step {
        while let Some(edge) = self.latch.pop() {
            let pressed = self.wiring.is_pressed(edge.level);
            match Button::from_line(edge.line) {
                Some(Button::Main) => self.main_edge(pressed, edge.at, handler),
                Some(Button::Aux) => self.aux_edge(pressed, edge.at, handler),
                None => warn!("edge on unknown line {}", edge.line),
            }
        }
        self.timed_checks(now, handler);
        self.next_step(now)
    }
}
