//! Fluent builder API for input source configuration.
//!
//! The builder stores the non-pin configuration (wiring convention,
//! debounce and long-press timing) and produces a source bound to its
//! [`EdgeLatch`]. Pins are handed to the built source afterwards with
//! `set_pin`, so the builder never has to name a board's GPIO types.
//!
//! # Usage
//!
//! ```no_run
//! use firmware::input::{Button, EdgeLatch, InputBuilder};
//! use platform::WiringType;
//!
//! static LATCH: EdgeLatch = EdgeLatch::new();
//!
//! let buttons = InputBuilder::two_button()
//!     .wiring(WiringType::ActiveLowPullup)
//!     .debounce_ms(30)
//!     .build_two_button::<platform::mocks::MockPin<'_>>(&LATCH);
//! # let _ = buttons;
//! ```

use embassy_time::Duration;
use platform::config::{DEFAULT_DEBOUNCE_MS, DEFAULT_LONG_PRESS_MS};
use platform::{InterruptPin, WiringType};

use super::{EdgeLatch, Joystick, TwoButton};

// ---------------------------------------------------------------------------
// InputKind: what this builder represents
// ---------------------------------------------------------------------------

/// Internal: what kind of input source the builder is configuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    /// Five-way joystick, edge-triggered.
    Joystick,
    /// Main + aux buttons, change-triggered.
    TwoButton,
}

// ---------------------------------------------------------------------------
// InputBuilder: main builder struct
// ---------------------------------------------------------------------------

/// Fluent builder for input sources.
///
/// Call [`InputBuilder::joystick()`] or [`InputBuilder::two_button()`] to
/// start, chain configuration methods, then call the matching `build_*`.
#[derive(Debug, Clone, Copy)]
pub struct InputBuilder {
    kind: InputKind,
    wiring: WiringType,
    debounce_ms: u64,
    long_press_ms: u64,
}

impl InputBuilder {
    /// Start building a joystick input.
    ///
    /// Default debounce: 50 ms.
    pub fn joystick() -> Self {
        Self {
            kind: InputKind::Joystick,
            wiring: WiringType::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
        }
    }

    /// Start building a two-button input.
    ///
    /// Default debounce: 50 ms. Default long press: 500 ms.
    pub fn two_button() -> Self {
        Self {
            kind: InputKind::TwoButton,
            ..Self::joystick()
        }
    }

    /// Set the electrical convention shared by every line.
    #[must_use]
    pub fn wiring(mut self, wiring: WiringType) -> Self {
        self.wiring = wiring;
        self
    }

    /// Set debounce time in milliseconds.
    #[must_use]
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the long-press threshold in milliseconds. Two-button only.
    #[must_use]
    pub fn long_press_ms(mut self, ms: u64) -> Self {
        self.long_press_ms = ms;
        self
    }

    /// Configured debounce.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Configured long-press threshold.
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    /// `true` if this builder was started with [`joystick`](Self::joystick).
    pub fn is_joystick(&self) -> bool {
        self.kind == InputKind::Joystick
    }

    /// Build a joystick reading `latch`.
    pub fn build_joystick<P: InterruptPin>(self, latch: &EdgeLatch) -> Joystick<'_, P> {
        if self.kind != InputKind::Joystick {
            warn!("building a joystick from a two-button configuration");
        }
        Joystick::new(latch, self.wiring, self.debounce())
    }

    /// Build a two-button source reading `latch`.
    pub fn build_two_button<P: InterruptPin>(self, latch: &EdgeLatch) -> TwoButton<'_, P> {
        if self.kind != InputKind::TwoButton {
            warn!("building a two-button source from a joystick configuration");
        }
        TwoButton::new(latch, self.wiring, self.debounce(), self.long_press())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let b = InputBuilder::two_button();
        assert_eq!(b.debounce(), Duration::from_millis(50));
        assert_eq!(b.long_press(), Duration::from_millis(500));
        assert!(!b.is_joystick());
        assert!(InputBuilder::joystick().is_joystick());
    }

    #[test]
    fn test_chain_overrides() {
        let b = InputBuilder::joystick()
            .wiring(WiringType::ActiveHigh)
            .debounce_ms(20)
            .long_press_ms(800);
        assert_eq!(b.debounce(), Duration::from_millis(20));
        assert_eq!(b.long_press(), Duration::from_millis(800));
        let latch = EdgeLatch::new();
        let js = b.build_joystick::<platform::mocks::MockPin<'_>>(&latch);
        assert_eq!(js.wiring(), WiringType::ActiveHigh);
    }
}
