//! E-ink driver capability.
//!
//! The compositor never talks to a controller directly. It hands a packed
//! 1bpp image to an [`EInkDriver`], asks for a refresh of a given
//! [`UpdateType`], then polls [`EInkDriver::is_busy`] on the schedule
//! returned by [`EInkDriver::poll_timing`] until the panel settles.
//!
//! # Image format
//!
//! One bit per pixel, MSB-first, rows packed to whole bytes, in the panel's
//! *native* orientation. A set bit is white (`BinaryColor::Off`), a clear bit
//! is black (`BinaryColor::On`).

use embassy_time::Duration;
use embedded_graphics::prelude::Size;

/// Kind of panel refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateType {
    /// Partial (differential) update. Quick, accumulates ghosting.
    Fast,
    /// Full waveform update. Slow, flashes, restores contrast.
    Full,
}

impl UpdateType {
    /// The stronger of two update types (`Full` wins).
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self == Self::Full || other == Self::Full {
            Self::Full
        } else {
            Self::Fast
        }
    }
}

impl core::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Full => "full",
        })
    }
}

/// Completion-polling schedule for one update type.
///
/// The first busy check happens `min_wait` after the update starts, every
/// subsequent one `interval` after the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Delay before the first busy check.
    pub min_wait: Duration,
    /// Delay between later busy checks.
    pub interval: Duration,
}

impl PollTiming {
    /// Build a schedule from millisecond values.
    #[must_use]
    pub const fn from_millis(interval_ms: u64, min_wait_ms: u64) -> Self {
        Self {
            min_wait: Duration::from_millis(min_wait_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }
}

/// Bytes needed for a packed 1bpp image of `width` x `height` pixels.
#[must_use]
pub const fn image_len(width: u32, height: u32) -> usize {
    let row = width.div_ceil(8) as usize;
    row.saturating_mul(height as usize)
}

/// Begin / update / poll capability of an e-ink panel.
///
/// Implementations must not block in [`start_update`](Self::start_update):
/// blocking waits belong in [`wait_idle`](Self::wait_idle), which the caller
/// only uses for synchronous refreshes.
pub trait EInkDriver {
    /// Error type for driver operations
    type DriverError: core::fmt::Debug;

    /// Native panel size (before any rotation).
    fn size(&self) -> Size;

    /// Whether the panel has a waveform for `update`.
    ///
    /// Every panel supports [`UpdateType::Full`].
    fn supports(&self, update: UpdateType) -> bool {
        matches!(update, UpdateType::Full)
    }

    /// Reset and configure the controller.
    fn begin(&mut self) -> Result<(), Self::DriverError>;

    /// Upload `image` and trigger a refresh. Returns as soon as the panel is
    /// working.
    fn start_update(&mut self, image: &[u8], update: UpdateType)
        -> Result<(), Self::DriverError>;

    /// `true` while the last update is still running.
    fn is_busy(&mut self) -> Result<bool, Self::DriverError>;

    /// Post-update housekeeping, called once after the panel goes idle.
    fn finish_update(&mut self) -> Result<(), Self::DriverError> {
        Ok(())
    }

    /// Polling schedule for `update`.
    fn poll_timing(&self, update: UpdateType) -> PollTiming;

    /// Block until the current update completes.
    fn wait_idle(&mut self) -> Result<(), Self::DriverError>;
}

/// Display errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// SPI communication error.
    #[error("display communication error")]
    Communication,
    /// GPIO operation error.
    #[error("display GPIO error")]
    Gpio,
    /// BUSY did not clear within the driver's blocking budget.
    #[error("display operation timeout")]
    Timeout,
    /// Caller supplied an image with the wrong number of bytes.
    #[error("image buffer has the wrong size")]
    InvalidBuffer,
    /// Operation called before `begin`.
    #[error("display not initialised")]
    InvalidState,
}
