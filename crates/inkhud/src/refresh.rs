//! Refresh state machine.
//!
//! ```text
//!            start(async)                  is_busy() == false
//!   Idle ──────────────────▶ InFlight ───────────────────────▶ Idle
//!     │                        │  ▲                          (finish_update)
//!     │ start(sync)            └──┘ is_busy() == true,
//!     ▼                            next poll after `interval`
//!   wait_idle + finish_update
//! ```
//!
//! The first busy check of an asynchronous refresh happens `min_wait` after
//! it starts. There is no cancellation: once started, a refresh is polled
//! until the driver reports idle.

use embassy_time::{Duration, Instant};
use platform::{EInkDriver, UpdateType};

/// Where the panel is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No refresh running
    Idle,
    /// Asynchronous refresh running
    InFlight {
        /// Type being run
        update: UpdateType,
        /// Earliest time for the next busy check
        next_poll: Instant,
        /// Gap between busy checks
        interval: Duration,
    },
}

/// Result of driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing running
    Idle,
    /// Still running; check again at the given instant.
    Pending(Instant),
    /// A refresh of this type just finished.
    Completed(UpdateType),
}

/// Tracks the single refresh the panel can run at a time.
#[derive(Debug, Clone)]
pub struct RefreshTracker {
    state: RefreshState,
    completed: u32,
}

impl RefreshTracker {
    /// Idle tracker.
    pub const fn new() -> Self {
        Self {
            state: RefreshState::Idle,
            completed: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// `true` if a new refresh may start.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, RefreshState::Idle)
    }

    /// Refreshes run to completion so far.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Upload `image` and start a refresh.
    ///
    /// A synchronous refresh blocks in the driver and completes before this
    /// returns. Calling `start` while a refresh is in flight starts nothing
    /// and reports the pending poll.
    pub fn start<D: EInkDriver>(
        &mut self,
        driver: &mut D,
        image: &[u8],
        update: UpdateType,
        is_async: bool,
        now: Instant,
    ) -> Result<PollOutcome, D::DriverError> {
        if let RefreshState::InFlight { next_poll, .. } = self.state {
            error!("refresh requested while another is in flight");
            return Ok(PollOutcome::Pending(next_poll));
        }

        debug!("starting {} refresh (async: {})", update, is_async);
        driver.start_update(image, update)?;

        if !is_async {
            driver.wait_idle()?;
            driver.finish_update()?;
            self.completed = self.completed.wrapping_add(1);
            return Ok(PollOutcome::Completed(update));
        }

        let timing = driver.poll_timing(update);
        let next_poll = now.checked_add(timing.min_wait).unwrap_or(now);
        self.state = RefreshState::InFlight {
            update,
            next_poll,
            interval: timing.interval,
        };
        Ok(PollOutcome::Pending(next_poll))
    }

    /// Check on an in-flight refresh, if its next poll is due.
    pub fn poll<D: EInkDriver>(
        &mut self,
        driver: &mut D,
        now: Instant,
    ) -> Result<PollOutcome, D::DriverError> {
        let RefreshState::InFlight {
            update,
            next_poll,
            interval,
        } = self.state
        else {
            return Ok(PollOutcome::Idle);
        };

        if now < next_poll {
            return Ok(PollOutcome::Pending(next_poll));
        }

        if driver.is_busy()? {
            let next_poll = now.checked_add(interval).unwrap_or(now);
            self.state = RefreshState::InFlight {
                update,
                next_poll,
                interval,
            };
            trace!("panel busy, next poll at {} ms", next_poll.as_millis());
            return Ok(PollOutcome::Pending(next_poll));
        }

        driver.finish_update()?;
        self.state = RefreshState::Idle;
        self.completed = self.completed.wrapping_add(1);
        debug!("{} refresh complete", update);
        Ok(PollOutcome::Completed(update))
    }
}

impl Default for RefreshTracker {
    fn default() -> Self {
        Self::new()
    }
}
