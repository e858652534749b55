//! GPIO input lines with interrupt capability.
//!
//! Level reads go through [`embedded_hal::digital::InputPin`]; interrupt
//! attach / detach and internal pull configuration are the extra surface a
//! debounced input source needs.

use embedded_hal::digital::InputPin;

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// External interrupt configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
    /// Trigger on rising edge
    RisingEdge,
    /// Trigger on falling edge
    FallingEdge,
    /// Trigger on both edges
    BothEdges,
}

/// Internal pull resistor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating input, external resistor on the board.
    None,
    /// Internal pull-up.
    Up,
    /// Internal pull-down.
    Down,
}

/// Electrical convention of a button line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WiringType {
    /// Pressed pulls the line low; board provides the pull-up.
    #[default]
    ActiveLow,
    /// Pressed drives the line high; board provides the pull-down.
    ActiveHigh,
    /// Pressed pulls the line low; MCU pull-up enabled.
    ActiveLowPullup,
    /// Pressed drives the line high; MCU pull-down enabled.
    ActiveHighPulldown,
}

impl WiringType {
    /// Level the line sits at while the button is held.
    #[must_use]
    pub fn pressed_level(self) -> PinState {
        match self {
            Self::ActiveLow | Self::ActiveLowPullup => PinState::Low,
            Self::ActiveHigh | Self::ActiveHighPulldown => PinState::High,
        }
    }

    /// Classify a raw line level.
    #[must_use]
    pub fn is_pressed(self, level: PinState) -> bool {
        level == self.pressed_level()
    }

    /// Internal pull this wiring asks for.
    #[must_use]
    pub fn pull(self) -> Pull {
        match self {
            Self::ActiveLowPullup => Pull::Up,
            Self::ActiveHighPulldown => Pull::Down,
            Self::ActiveLow | Self::ActiveHigh => Pull::None,
        }
    }

    /// Edge produced by the button going down.
    #[must_use]
    pub fn press_edge(self) -> InterruptMode {
        match self.pressed_level() {
            PinState::Low => InterruptMode::FallingEdge,
            PinState::High => InterruptMode::RisingEdge,
        }
    }
}

/// Input line that can raise an interrupt.
///
/// The interrupt handler itself is bound by the board crate; this trait only
/// arms and disarms it.
pub trait InterruptPin: InputPin {
    /// Configure the internal pull resistor.
    fn set_pull(&mut self, pull: Pull) -> Result<(), Self::Error>;

    /// Enable interrupt
    fn enable_interrupt(&mut self, mode: InterruptMode) -> Result<(), Self::Error>;

    /// Disable interrupt
    fn disable_interrupt(&mut self) -> Result<(), Self::Error>;

    /// Read the line as a [`PinState`].
    fn level(&mut self) -> Result<PinState, Self::Error> {
        self.is_high().map(PinState::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_low_wiring() {
        assert!(WiringType::ActiveLow.is_pressed(PinState::Low));
        assert!(!WiringType::ActiveLow.is_pressed(PinState::High));
        assert_eq!(WiringType::ActiveLow.press_edge(), InterruptMode::FallingEdge);
        assert_eq!(WiringType::ActiveLow.pull(), Pull::None);
    }

    #[test]
    fn test_pull_variants_request_internal_resistor() {
        assert_eq!(WiringType::ActiveLowPullup.pull(), Pull::Up);
        assert_eq!(WiringType::ActiveHighPulldown.pull(), Pull::Down);
        assert_eq!(
            WiringType::ActiveHighPulldown.press_edge(),
            InterruptMode::RisingEdge
        );
    }

    #[test]
    fn test_pin_state_bool_round() {
        assert_eq!(PinState::from(true), PinState::High);
        assert!(!bool::from(PinState::Low));
    }
}
