//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests. Shared state lives in `Cell`s so a
//! test can keep a `&` handle while the code under test owns the mock.

#![cfg(any(test, feature = "std"))]

use core::cell::Cell;
use core::convert::Infallible;

use embassy_time::{Duration, Instant};
use embedded_graphics::prelude::Size;

use crate::*;

/// Largest image the mock display keeps (fits a 122x250 panel).
pub const MOCK_IMAGE_MAX: usize = 4096;

// ---------------------------------------------------------------------------
// MockDisplay
// ---------------------------------------------------------------------------

/// Recording e-ink driver.
///
/// Every update reports busy for a scripted number of polls. Starting an
/// update while another is still busy is counted as an overlap, which tests
/// use to check that at most one refresh is in flight.
pub struct MockDisplay {
    size: Size,
    fast_supported: bool,
    busy_polls: u32,
    busy_remaining: u32,
    begun: bool,
    overlaps: u32,
    finished: u32,
    waited: u32,
    updates: heapless::Vec<UpdateType, 64>,
    image: heapless::Vec<u8, MOCK_IMAGE_MAX>,
}

impl MockDisplay {
    /// Create new mock display with FAST support and no busy time.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            fast_supported: true,
            busy_polls: 0,
            busy_remaining: 0,
            begun: false,
            overlaps: 0,
            finished: 0,
            waited: 0,
            updates: heapless::Vec::new(),
            image: heapless::Vec::new(),
        }
    }

    /// Report busy for `polls` checks after each update.
    #[must_use]
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Toggle FAST waveform support.
    #[must_use]
    pub fn with_fast(mut self, supported: bool) -> Self {
        self.fast_supported = supported;
        self
    }

    /// Update types in the order they were started.
    pub fn updates(&self) -> &[UpdateType] {
        &self.updates
    }

    /// Number of updates started.
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    /// Updates started while a previous one was still busy.
    pub fn overlaps(&self) -> u32 {
        self.overlaps
    }

    /// `finish_update` calls.
    pub fn finished(&self) -> u32 {
        self.finished
    }

    /// `wait_idle` calls.
    pub fn waited(&self) -> u32 {
        self.waited
    }

    /// Whether `begin` ran.
    pub fn begun(&self) -> bool {
        self.begun
    }

    /// Last image uploaded.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// `true` if native pixel (`x`, `y`) of the last image is black.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.size.width || y >= self.size.height {
            return false;
        }
        let row = self.size.width.div_ceil(8) as usize;
        let index = (y as usize)
            .saturating_mul(row)
            .saturating_add(x as usize / 8);
        let mask = 0x80u8 >> (x % 8);
        self.image.get(index).is_some_and(|b| b & mask == 0)
    }

    /// Count black pixels in the last image.
    pub fn black_pixels(&self) -> u32 {
        let mut count = 0u32;
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                if self.is_black(x, y) {
                    count = count.saturating_add(1);
                }
            }
        }
        count
    }
}

impl EInkDriver for MockDisplay {
    type DriverError = DisplayError;

    fn size(&self) -> Size {
        self.size
    }

    fn supports(&self, update: UpdateType) -> bool {
        match update {
            UpdateType::Full => true,
            UpdateType::Fast => self.fast_supported,
        }
    }

    fn begin(&mut self) -> Result<(), DisplayError> {
        self.begun = true;
        Ok(())
    }

    fn start_update(&mut self, image: &[u8], update: UpdateType) -> Result<(), DisplayError> {
        if !self.begun {
            return Err(DisplayError::InvalidState);
        }
        if image.len() != image_len(self.size.width, self.size.height) {
            return Err(DisplayError::InvalidBuffer);
        }
        if self.busy_remaining > 0 {
            self.overlaps = self.overlaps.saturating_add(1);
        }
        self.image.clear();
        self.image
            .extend_from_slice(image)
            .map_err(|_| DisplayError::InvalidBuffer)?;
        self.updates
            .push(update)
            .map_err(|_| DisplayError::InvalidState)?;
        self.busy_remaining = self.busy_polls;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, DisplayError> {
        if self.busy_remaining > 0 {
            self.busy_remaining = self.busy_remaining.saturating_sub(1);
            return Ok(true);
        }
        Ok(false)
    }

    fn finish_update(&mut self) -> Result<(), DisplayError> {
        self.finished = self.finished.saturating_add(1);
        Ok(())
    }

    fn poll_timing(&self, update: UpdateType) -> PollTiming {
        match update {
            UpdateType::Fast => PollTiming::from_millis(50, 300),
            UpdateType::Full => PollTiming::from_millis(100, 2500),
        }
    }

    fn wait_idle(&mut self) -> Result<(), DisplayError> {
        self.waited = self.waited.saturating_add(1);
        self.busy_remaining = 0;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockLine / MockPin
// ---------------------------------------------------------------------------

/// Simulated input line shared between a test and the pin handed out.
pub struct MockLine {
    level: Cell<PinState>,
    interrupt: Cell<Option<InterruptMode>>,
    pull: Cell<Pull>,
}

impl MockLine {
    /// Line resting at `level`.
    pub const fn new(level: PinState) -> Self {
        Self {
            level: Cell::new(level),
            interrupt: Cell::new(None),
            pull: Cell::new(Pull::None),
        }
    }

    /// Drive the line.
    pub fn set_level(&self, level: PinState) {
        self.level.set(level);
    }

    /// Armed interrupt, if any.
    pub fn interrupt(&self) -> Option<InterruptMode> {
        self.interrupt.get()
    }

    /// Configured pull.
    pub fn pull(&self) -> Pull {
        self.pull.get()
    }

    /// Pin handle reading this line.
    pub fn pin(&self) -> MockPin<'_> {
        MockPin { line: self }
    }
}

/// Pin handle over a [`MockLine`].
pub struct MockPin<'a> {
    line: &'a MockLine,
}

impl embedded_hal::digital::ErrorType for MockPin<'_> {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for MockPin<'_> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.line.level.get() == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.line.level.get() == PinState::Low)
    }
}

impl InterruptPin for MockPin<'_> {
    fn set_pull(&mut self, pull: Pull) -> Result<(), Infallible> {
        self.line.pull.set(pull);
        Ok(())
    }

    fn enable_interrupt(&mut self, mode: InterruptMode) -> Result<(), Infallible> {
        self.line.interrupt.set(Some(mode));
        Ok(())
    }

    fn disable_interrupt(&mut self) -> Result<(), Infallible> {
        self.line.interrupt.set(None);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Manually advanced monotonic clock.
#[derive(Default)]
pub struct MockClock {
    millis: Cell<u64>,
}

impl MockClock {
    /// Clock starting at `millis`.
    pub const fn new(millis: u64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    /// Move forward.
    pub fn advance(&self, by: Duration) {
        self.millis
            .set(self.millis.get().saturating_add(by.as_millis()));
    }

    /// Move forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }
}

/// Settable wall clock.
#[derive(Default)]
pub struct MockRtc {
    epoch: Cell<Option<u32>>,
}

impl MockRtc {
    /// Wall clock reading `epoch`.
    pub const fn new(epoch: Option<u32>) -> Self {
        Self {
            epoch: Cell::new(epoch),
        }
    }

    /// Set the reading.
    pub fn set(&self, epoch: Option<u32>) {
        self.epoch.set(epoch);
    }
}

impl Rtc for MockRtc {
    fn epoch_seconds(&self) -> Option<u32> {
        self.epoch.get()
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory settings store.
#[derive(Default)]
pub struct MemoryStore {
    blob: Option<heapless::Vec<u8, { crate::config::SETTINGS_BLOB_MAX }>>,
    writes: u32,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `bytes`.
    pub fn with_blob(bytes: &[u8]) -> Self {
        let mut blob = heapless::Vec::new();
        // Oversized seeds are truncated.
        for b in bytes.iter().take(crate::config::SETTINGS_BLOB_MAX) {
            blob.push(*b).ok();
        }
        Self {
            blob: Some(blob),
            writes: 0,
        }
    }

    /// Current blob.
    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }

    /// Flip every bit of byte `index`.
    pub fn corrupt(&mut self, index: usize) {
        if let Some(b) = self.blob.as_mut().and_then(|blob| blob.get_mut(index)) {
            *b = !*b;
        }
    }

    /// Number of successful `store` calls.
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl SettingsStore for MemoryStore {
    type Error = StorageError;

    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let Some(blob) = self.blob.as_ref() else {
            return Ok(None);
        };
        let dst = buf.get_mut(..blob.len()).ok_or(StorageError::TooLarge)?;
        dst.copy_from_slice(blob);
        Ok(Some(blob.len()))
    }

    fn store(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let mut blob = heapless::Vec::new();
        blob.extend_from_slice(data)
            .map_err(|_| StorageError::TooLarge)?;
        self.blob = Some(blob);
        self.writes = self.writes.saturating_add(1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingHandler
// ---------------------------------------------------------------------------

/// [`InputHandler`] that remembers what it was given.
#[derive(Default)]
pub struct RecordingHandler {
    events: heapless::Vec<InputEvent, 32>,
}

impl RecordingHandler {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }
}

impl InputHandler for RecordingHandler {
    fn handle_input(&mut self, event: InputEvent) {
        self.events.push(event).ok();
    }
}
