//! Time sources.
//!
//! Two distinct clocks: a monotonic [`Clock`] for scheduling and debounce,
//! and a wall-clock [`Rtc`] that may not be set yet.

use embassy_time::Instant;

/// Monotonic time source.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock source.
pub trait Rtc {
    /// Seconds since the Unix epoch, or `None` if the clock has never been
    /// set from a trusted source.
    fn epoch_seconds(&self) -> Option<u32>;
}

/// [`Clock`] backed by the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<T: Rtc + ?Sized> Rtc for &T {
    fn epoch_seconds(&self) -> Option<u32> {
        (**self).epoch_seconds()
    }
}
