//! Debounced input sources.
//!
//! Two interrupt-driven designs share one handoff:
//!
//! | Source | Interrupt on | Debounce decision |
//! |--------|--------------|-------------------|
//! | [`Joystick`] | press edge | release polled every 10 ms, held time compared on release |
//! | [`TwoButton`] | every edge | press time-stamped, compared on the release edge |
//!
//! In both, the interrupt handler only records an [`Edge`] in an
//! [`EdgeLatch`] and sets the source's bit in
//! [`WakeFlags`](crate::scheduler::WakeFlags) through an [`IsrHandoff`].
//! Gestures reach the [`InputHandler`] from [`InputSource::service`], which
//! the main loop calls from the source's scheduler slot.
//!
//! ```text
//! EXTI ─▶ IsrHandoff::edge() ─▶ EdgeLatch + WakeFlags
//!                                      │
//!            scheduler slot ─▶ InputSource::service() ─▶ InputHandler
//! ```

use embassy_time::{Duration, Instant};
use platform::{InputHandler, PinState};

use crate::scheduler::{SlotId, Step, WakeFlags};

pub mod builder;
pub mod joystick;
pub mod latch;
pub mod two_button;

pub use builder::InputBuilder;
pub use joystick::{Direction, Joystick};
pub use latch::{Edge, EdgeLatch};
pub use two_button::{Button, TwoButton};

/// Release polling period of the edge-triggered design.
pub const RELEASE_POLL: Duration = Duration::from_millis(platform::config::RELEASE_POLL_MS);

/// Input configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Reading or configuring a line failed.
    #[error("input pin error")]
    Pin,
    /// `start` called before any line was assigned.
    #[error("input source has no lines")]
    NoLines,
}

/// A debounced input source serviced by the cooperative scheduler.
pub trait InputSource {
    /// Attach interrupts (wiring and pull applied first).
    fn start(&mut self) -> Result<(), InputError>;

    /// Detach interrupts. Configuration is kept so `start` restores it.
    fn stop(&mut self) -> Result<(), InputError>;

    /// Drain recorded edges, deliver gestures, say when to run next.
    fn service(&mut self, now: Instant, handler: &mut dyn InputHandler) -> Step;
}

/// Everything an interrupt handler needs, usable from a `static`.
pub struct IsrHandoff<'a> {
    latch: &'a EdgeLatch,
    wake: &'a WakeFlags,
    slot: SlotId,
}

impl<'a> IsrHandoff<'a> {
    /// Bind a latch to the scheduler slot that services it.
    pub const fn new(latch: &'a EdgeLatch, wake: &'a WakeFlags, slot: SlotId) -> Self {
        Self { latch, wake, slot }
    }

    /// Interrupt body: record the edge, arm the slot. Nothing else.
    pub fn edge(&self, line: u8, level: PinState, now: Instant) {
        if self.latch.record(Edge::new(line, level, now)) {
            self.wake.request(self.slot);
        }
    }
}
