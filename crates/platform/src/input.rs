//! Navigation input events

/// Debounced gestures delivered to the compositor.
///
/// Physical sources (two-button boards, five-way joysticks) are mapped onto
/// these at setup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Main button tapped
    ButtonShort,
    /// Main button held
    ButtonLong,
    /// Auxiliary button went down
    AuxDown,
    /// Auxiliary button came back up
    AuxUp,
}

impl core::fmt::Display for InputEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::ButtonShort => "short press",
            Self::ButtonLong => "long press",
            Self::AuxDown => "aux down",
            Self::AuxUp => "aux up",
        })
    }
}

/// Receiver of debounced input, always called outside interrupt context.
pub trait InputHandler {
    /// Handle one gesture.
    fn handle_input(&mut self, event: InputEvent);
}

impl<F: FnMut(InputEvent)> InputHandler for F {
    fn handle_input(&mut self, event: InputEvent) {
        self(event);
    }
}
