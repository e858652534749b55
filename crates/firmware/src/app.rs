//! Device root context.
//!
//! [`Device`] is built once by the entry point and owns everything the main
//! loop touches: the window manager, the scheduler, the input sources and
//! the storage/clock collaborators. Interrupt handlers only see the two
//! shared statics it borrows: a [`WakeFlags`] and the [`CommandQueue`].
//!
//! ```text
//!  ISR ──Edge──▶ EdgeLatch ──bit──▶ WakeFlags ─┐
//!  radio/console ──DisplayCommand──▶ Queue ────┤
//!                                              ▼
//!                           Device::tick ── Scheduler slots
//!                             ├─ display: WindowManager::run
//!                             ├─ clock:   Rtc → ClockTick every minute
//!                             └─ input N: InputSource::service → navigation
//! ```
//!
//! Slot ids are fixed by registration order so board interrupt handlers can
//! name them in a `const` [`IsrHandoff`](crate::input::IsrHandoff).

use core::fmt;

use embassy_time::{Duration, Instant};
use heapless::Vec;
use inkhud::{
    Event, RefreshRequest, RefreshState, RunOutcome, SettingsError, WindowManager, WindowManagerError,
};
use platform::{Clock, EInkDriver, InputEvent, Rtc, SettingsStore, UpdateType};

use crate::commands::{CommandQueue, DisplayCommand};
use crate::input::{InputError, InputSource};
use crate::scheduler::{Scheduler, SchedulerError, SlotId, Step, WakeFlags, DEFAULT_SLOTS};

/// Scheduler slot of the window manager.
pub const DISPLAY_SLOT: SlotId = SlotId(0);
/// Scheduler slot of the minute clock.
pub const CLOCK_SLOT: SlotId = SlotId(1);
/// Input sources a device can own.
pub const MAX_INPUTS: usize = DEFAULT_SLOTS - 2;
/// Clock events are published this often while the RTC is set.
pub const CLOCK_PERIOD: Duration = Duration::from_secs(60);

/// Scheduler slot of the `index`-th input source added to the device.
pub const fn input_slot(index: u8) -> SlotId {
    SlotId(index.saturating_add(2))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Device failures. `E` is the display driver's error type.
#[derive(Debug)]
pub enum DeviceError<E: fmt::Debug> {
    /// Window manager or display driver failed.
    Display(WindowManagerError<E>),
    /// An input source could not be attached or detached.
    Input(InputError),
    /// No scheduler slot left for another input.
    Scheduler(SchedulerError),
    /// Settings could not be saved.
    Settings(SettingsError),
}

impl<E: fmt::Debug> From<WindowManagerError<E>> for DeviceError<E> {
    fn from(e: WindowManagerError<E>) -> Self {
        Self::Display(e)
    }
}

impl<E: fmt::Debug> From<InputError> for DeviceError<E> {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl<E: fmt::Debug> From<SchedulerError> for DeviceError<E> {
    fn from(e: SchedulerError) -> Self {
        Self::Scheduler(e)
    }
}

impl<E: fmt::Debug> From<SettingsError> for DeviceError<E> {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

impl<E: fmt::Debug> fmt::Display for DeviceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display(e) => write!(f, "{e}"),
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Scheduler(e) => write!(f, "scheduler: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
        }
    }
}

type DeviceResult<T, D> = Result<T, DeviceError<<D as EInkDriver>::DriverError>>;

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Root context: exactly one per firmware image, owned by the entry point.
pub struct Device<'a, D: EInkDriver, S: SettingsStore, C: Clock, R: Rtc> {
    wm: WindowManager<'a, D>,
    scheduler: Scheduler,
    inputs: Vec<&'a mut dyn InputSource, MAX_INPUTS>,
    wake: &'a WakeFlags,
    commands: &'a CommandQueue,
    store: S,
    clock: C,
    rtc: R,
    asleep: bool,
}

impl<'a, D, S, C, R> Device<'a, D, S, C, R>
where
    D: EInkDriver,
    S: SettingsStore,
    C: Clock,
    R: Rtc,
{
    /// Wire the device together. Nothing touches hardware until
    /// [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// [`DeviceError::Scheduler`] if the fixed slots cannot be registered.
    pub fn new(
        wm: WindowManager<'a, D>,
        wake: &'a WakeFlags,
        commands: &'a CommandQueue,
        store: S,
        clock: C,
        rtc: R,
    ) -> DeviceResult<Self, D> {
        let mut scheduler = Scheduler::new();
        let display = scheduler.add("display")?;
        let minute = scheduler.add("clock")?;
        debug_assert_eq!(display, DISPLAY_SLOT);
        debug_assert_eq!(minute, CLOCK_SLOT);
        Ok(Self {
            wm,
            scheduler,
            inputs: Vec::new(),
            wake,
            commands,
            store,
            clock,
            rtc,
            asleep: false,
        })
    }

    /// Add an input source. Returns the slot its interrupt handler must
    /// request, equal to [`input_slot`] of the number of inputs added before.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Scheduler`] when every slot is taken.
    pub fn add_input(&mut self, source: &'a mut dyn InputSource) -> DeviceResult<SlotId, D> {
        if self.inputs.is_full() {
            return Err(SchedulerError::Full.into());
        }
        let slot = self.scheduler.add("input")?;
        self.inputs.push(source).map_err(|_| SchedulerError::Full)?;
        Ok(slot)
    }

    /// Start the display and attach every input.
    ///
    /// # Errors
    ///
    /// Fatal layout configuration or driver failure from the window manager,
    /// or an input that cannot be attached.
    pub fn begin(&mut self) -> DeviceResult<(), D> {
        let now = self.clock.now();
        self.wm.set_clock(self.rtc.epoch_seconds());
        self.wm.begin(now)?;
        self.commands.set_attached(true);
        for input in self.inputs.iter_mut() {
            input.start()?;
        }
        self.scheduler.run_asap(DISPLAY_SLOT, now);
        self.scheduler.run_asap(CLOCK_SLOT, now);
        info!("device started with {} inputs", self.inputs.len());
        Ok(())
    }

    /// One main-loop pass: absorb interrupt requests, drain commands, run
    /// due slots. Returns when the loop should run again, `None` to wait for
    /// the next interrupt.
    ///
    /// # Errors
    ///
    /// Display driver failure or a failed sleep transition.
    pub fn tick(&mut self) -> DeviceResult<Option<Instant>, D> {
        let now = self.clock.now();
        self.scheduler.absorb(self.wake, now);

        let mut kick = false;
        while let Some(command) = self.commands.take() {
            self.execute(command, now)?;
            kick = true;
        }

        kick |= self.run_slots(now)?;
        if kick {
            // Navigation and events above may have queued redraws.
            self.scheduler.run_asap(DISPLAY_SLOT, now);
            self.run_slots(now)?;
        }
        Ok(self.scheduler.next_wake())
    }

    /// Detach inputs and persist settings before light sleep.
    ///
    /// # Errors
    ///
    /// An input that cannot be detached, or a settings write failure.
    pub fn before_light_sleep(&mut self) -> DeviceResult<(), D> {
        if self.asleep {
            return Ok(());
        }
        if !matches!(self.wm.refresh_state(), RefreshState::Idle) {
            // The panel must not lose power mid-waveform.
            self.wm
                .driver_mut()
                .wait_idle()
                .map_err(|e| DeviceError::Display(WindowManagerError::Driver(e)))?;
        }
        for (i, input) in self.inputs.iter_mut().enumerate() {
            input.stop()?;
            self.scheduler.disable(input_slot(i as u8));
        }
        self.scheduler.disable(CLOCK_SLOT);
        if self.wm.save_settings_if_dirty(&mut self.store)? {
            info!("settings saved before sleep");
        }
        self.asleep = true;
        debug!("ready for light sleep");
        Ok(())
    }

    /// Reattach inputs after light sleep. Wiring, pins and debounce are
    /// unchanged.
    ///
    /// # Errors
    ///
    /// An input that cannot be reattached.
    pub fn after_light_sleep(&mut self) -> DeviceResult<(), D> {
        if !self.asleep {
            return Ok(());
        }
        for input in self.inputs.iter_mut() {
            input.start()?;
        }
        let now = self.clock.now();
        self.scheduler.run_asap(CLOCK_SLOT, now);
        self.scheduler.run_asap(DISPLAY_SLOT, now);
        self.asleep = false;
        debug!("woke from light sleep");
        Ok(())
    }

    /// Persist settings changed through the menu.
    ///
    /// # Errors
    ///
    /// Encoding or storage failure.
    pub fn save_settings(&mut self) -> DeviceResult<bool, D> {
        Ok(self.wm.save_settings_if_dirty(&mut self.store)?)
    }

    /// `true` between the sleep hooks.
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Window manager
    pub fn window_manager(&self) -> &WindowManager<'a, D> {
        &self.wm
    }

    /// Window manager, mutably
    pub fn window_manager_mut(&mut self) -> &mut WindowManager<'a, D> {
        &mut self.wm
    }

    /// Settings storage
    pub fn store(&self) -> &S {
        &self.store
    }

    fn execute(&mut self, command: DisplayCommand, now: Instant) -> DeviceResult<(), D> {
        trace!("command {}", command);
        match command {
            DisplayCommand::Input(event) => navigate(&mut self.wm, event, now),
            DisplayCommand::NewData { source } => self.wm.publish(&Event::NewData { source }, now),
            DisplayCommand::ClockTick { epoch } => self.wm.publish(&Event::ClockTick { epoch }, now),
            DisplayCommand::Refresh(update) => self.wm.request_update(match update {
                UpdateType::Fast => RefreshRequest::fast().all_tiles(),
                UpdateType::Full => RefreshRequest::full().all_tiles(),
            }),
            DisplayCommand::PrepareSleep => self.before_light_sleep()?,
            DisplayCommand::Wake => self.after_light_sleep()?,
        }
        Ok(())
    }

    /// Run due slots. Returns `true` if any input delivered a gesture.
    fn run_slots(&mut self, now: Instant) -> DeviceResult<bool, D> {
        let wm = &mut self.wm;
        let inputs = &mut self.inputs;
        let rtc = &self.rtc;
        let mut delivered = false;
        let mut failure = None;

        self.scheduler.run_due(now, |slot| match slot {
            DISPLAY_SLOT => match wm.run(now) {
                Ok(RunOutcome::PollAt(at)) => {
                    Step::RunAgainIn(at.checked_duration_since(now).unwrap_or(Duration::from_ticks(0)))
                }
                Ok(RunOutcome::Idle) => Step::Disable,
                Err(e) => {
                    error!("display slot failed");
                    failure = Some(e);
                    Step::Disable
                }
            },
            CLOCK_SLOT => {
                if let Some(epoch) = rtc.epoch_seconds() {
                    wm.publish(&Event::ClockTick { epoch }, now);
                    delivered = true;
                }
                Step::RunAgainIn(CLOCK_PERIOD)
            }
            SlotId(n) => {
                let index = usize::from(n.saturating_sub(CLOCK_SLOT.0.saturating_add(1)));
                let Some(input) = inputs.get_mut(index) else {
                    return Step::Disable;
                };
                let mut handler = |event: InputEvent| {
                    navigate(wm, event, now);
                    delivered = true;
                };
                input.service(now, &mut handler)
            }
        });

        match failure {
            Some(e) => Err(DeviceError::Display(e)),
            None => Ok(delivered),
        }
    }
}

/// Map one gesture onto the window manager's navigation handlers.
fn navigate<D: EInkDriver>(wm: &mut WindowManager<'_, D>, event: InputEvent, now: Instant) {
    match event {
        InputEvent::ButtonShort => wm.handle_button_short(),
        InputEvent::ButtonLong => wm.handle_button_long(),
        InputEvent::AuxDown => wm.handle_aux_down(now),
        InputEvent::AuxUp => wm.handle_aux_up(now),
    }
}
