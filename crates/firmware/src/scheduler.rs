//! Cooperative scheduler.
//!
//! A fixed table of runnable slots polled by the main loop. Each slot is
//! enabled or disabled on its own and carries the instant it next wants to
//! run. Interrupt handlers never touch the table: they set a bit in
//! [`WakeFlags`], and the next [`Scheduler::absorb`] turns that bit into a
//! "run as soon as possible" for the slot.
//!
//! ```text
//! ISR ── WakeFlags::request(slot) ──▶ absorb() ──▶ slot due now
//!                                                    │
//! main loop ── run_due(now, |slot| Step) ◀───────────┘
//! ```

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Slots a [`Scheduler`] holds unless told otherwise.
pub const DEFAULT_SLOTS: usize = 8;

/// Handle to a scheduler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(pub u8);

impl SlotId {
    fn bit(self) -> u32 {
        1u32.checked_shl(u32::from(self.0)).unwrap_or(0)
    }
}

/// What a slot wants after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Run again after this long.
    RunAgainIn(Duration),
    /// Stop until enabled again.
    Disable,
}

/// Scheduler errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Every slot is taken.
    #[error("scheduler slot table full")]
    Full,
}

// ---------------------------------------------------------------------------
// WakeFlags: the interrupt side
// ---------------------------------------------------------------------------

/// Run-as-soon-as-possible requests raised from interrupt context.
///
/// Lives in a `static`; the only operation an ISR performs is
/// [`request`](Self::request), a single word write inside a critical section.
pub struct WakeFlags {
    bits: Mutex<Cell<u32>>,
}

impl WakeFlags {
    /// No requests pending.
    pub const fn new() -> Self {
        Self {
            bits: Mutex::new(Cell::new(0)),
        }
    }

    /// Ask for `slot` to run on the next scheduler pass. Interrupt safe.
    pub fn request(&self, slot: SlotId) {
        critical_section::with(|cs| {
            let bits = self.bits.borrow(cs);
            bits.set(bits.get() | slot.bit());
        });
    }

    /// `true` if any request is pending.
    pub fn any(&self) -> bool {
        critical_section::with(|cs| self.bits.borrow(cs).get() != 0)
    }

    /// Read and clear every pending request.
    pub fn take(&self) -> u32 {
        critical_section::with(|cs| self.bits.borrow(cs).replace(0))
    }
}

impl Default for WakeFlags {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Scheduler: the main-loop side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Slot {
    name: &'static str,
    enabled: bool,
    next_run: Instant,
}

/// Slot table owned by the main loop.
pub struct Scheduler<const N: usize = DEFAULT_SLOTS> {
    slots: Vec<Slot, N>,
}

impl<const N: usize> Scheduler<N> {
    /// Empty table.
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Register a disabled slot.
    pub fn add(&mut self, name: &'static str) -> Result<SlotId, SchedulerError> {
        let id = u8::try_from(self.slots.len()).map_err(|_| SchedulerError::Full)?;
        if id >= 32 {
            return Err(SchedulerError::Full);
        }
        self.slots
            .push(Slot {
                name,
                enabled: false,
                next_run: Instant::from_ticks(0),
            })
            .map_err(|_| SchedulerError::Full)?;
        debug!("scheduler slot {} = {}", id, name);
        Ok(SlotId(id))
    }

    /// Enable `slot` to run `interval` from `now`.
    pub fn set_interval_from_now(&mut self, slot: SlotId, interval: Duration, now: Instant) {
        if let Some(s) = self.slots.get_mut(usize::from(slot.0)) {
            s.enabled = true;
            s.next_run = now.checked_add(interval).unwrap_or(Instant::MAX);
        }
    }

    /// Enable `slot` to run on the next pass.
    pub fn run_asap(&mut self, slot: SlotId, now: Instant) {
        self.set_interval_from_now(slot, Duration::from_ticks(0), now);
    }

    /// Stop `slot` until it is enabled again.
    pub fn disable(&mut self, slot: SlotId) {
        if let Some(s) = self.slots.get_mut(usize::from(slot.0)) {
            s.enabled = false;
        }
    }

    /// `true` if `slot` will run at some point.
    pub fn is_enabled(&self, slot: SlotId) -> bool {
        self.slots
            .get(usize::from(slot.0))
            .is_some_and(|s| s.enabled)
    }

    /// Turn interrupt requests into immediate runs.
    pub fn absorb(&mut self, wake: &WakeFlags, now: Instant) {
        let bits = wake.take();
        if bits == 0 {
            return;
        }
        for (i, s) in self.slots.iter_mut().enumerate() {
            let bit = 1u32.checked_shl(i as u32).unwrap_or(0);
            if bits & bit != 0 {
                trace!("wake {}", s.name);
                s.enabled = true;
                s.next_run = now;
            }
        }
    }

    /// Run every enabled slot whose time has come, once each, in slot order.
    /// Returns how many ran.
    pub fn run_due(&mut self, now: Instant, mut run: impl FnMut(SlotId) -> Step) -> usize {
        let mut ran = 0usize;
        for i in 0..self.slots.len() {
            let due = self
                .slots
                .get(i)
                .is_some_and(|s| s.enabled && s.next_run <= now);
            if !due {
                continue;
            }
            let id = SlotId(i as u8);
            let step = run(id);
            ran = ran.saturating_add(1);
            match step {
                Step::RunAgainIn(after) => self.set_interval_from_now(id, after, now),
                Step::Disable => self.disable(id),
            }
        }
        ran
    }

    /// Earliest instant any enabled slot wants to run.
    pub fn next_wake(&self) -> Option<Instant> {
        self.slots
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.next_run)
            .min()
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Instant {
        Instant::from_millis(v)
    }

    #[test]
    fn test_new_slot_is_disabled() {
        let mut s: Scheduler<4> = Scheduler::new();
        let a = s.add("a").unwrap();
        assert!(!s.is_enabled(a));
        assert_eq!(s.run_due(ms(1_000), |_| Step::Disable), 0);
        assert_eq!(s.next_wake(), None);
    }

    #[test]
    fn test_interval_and_rescheduling() {
        let mut s: Scheduler<4> = Scheduler::new();
        let a = s.add("a").unwrap();
        s.set_interval_from_now(a, Duration::from_millis(10), ms(0));
        assert_eq!(s.run_due(ms(5), |_| Step::Disable), 0);
        assert_eq!(s.next_wake(), Some(ms(10)));

        let ran = s.run_due(ms(10), |_| Step::RunAgainIn(Duration::from_millis(10)));
        assert_eq!(ran, 1);
        assert_eq!(s.next_wake(), Some(ms(20)));

        s.run_due(ms(20), |_| Step::Disable);
        assert!(!s.is_enabled(a));
    }

    #[test]
    fn test_wake_flag_runs_slot_asap() {
        let wake = WakeFlags::new();
        let mut s: Scheduler<4> = Scheduler::new();
        let _a = s.add("a").unwrap();
        let b = s.add("b").unwrap();

        wake.request(b);
        assert!(wake.any());
        s.absorb(&wake, ms(42));
        assert!(!wake.any());

        let mut seen = None;
        s.run_due(ms(42), |id| {
            seen = Some(id);
            Step::Disable
        });
        assert_eq!(seen, Some(b));
    }

    #[test]
    fn test_run_asap_overrides_long_interval() {
        let mut s: Scheduler<2> = Scheduler::new();
        let a = s.add("a").unwrap();
        s.set_interval_from_now(a, Duration::from_secs(60), ms(0));
        s.run_asap(a, ms(1));
        assert_eq!(s.next_wake(), Some(ms(1)));
    }

    #[test]
    fn test_table_full() {
        let mut s: Scheduler<1> = Scheduler::new();
        s.add("a").unwrap();
        assert_eq!(s.add("b"), Err(SchedulerError::Full));
    }
}
