//! Display command queue.
//!
//! Work destined for the compositor from outside the main loop (a radio
//! task, a serial console, the sleep controller) is posted as a tagged
//! [`DisplayCommand`] into a bounded [`CommandQueue`]. Posting never blocks:
//! a full queue hands the command back, and posting to a device without a
//! display fails before touching the queue.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use platform::{InputEvent, UpdateType};

/// Default queue depth.
pub const COMMAND_DEPTH: usize = 8;

/// Work for the display side of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayCommand {
    /// Navigation gesture from a source other than the local buttons.
    Input(InputEvent),
    /// Opaque "new data" from an external collaborator.
    NewData {
        /// Collaborator tag
        source: u8,
    },
    /// Wall-clock time became known or changed.
    ClockTick {
        /// Seconds since the Unix epoch
        epoch: u32,
    },
    /// Redraw every tile with this refresh type.
    Refresh(UpdateType),
    /// About to enter light sleep.
    PrepareSleep,
    /// Back from light sleep.
    Wake,
}

impl core::fmt::Display for DisplayCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Input(event) => write!(f, "input ({event})"),
            Self::NewData { source } => write!(f, "new data from {source}"),
            Self::ClockTick { epoch } => write!(f, "clock tick {epoch}"),
            Self::Refresh(update) => write!(f, "{update} refresh"),
            Self::PrepareSleep => f.write_str("prepare sleep"),
            Self::Wake => f.write_str("wake"),
        }
    }
}

/// Rejected [`CommandQueue::post`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnqueueError {
    /// No display attached; nothing would consume the command.
    #[error("no display attached")]
    DisplayUnused,
    /// Queue at capacity. The command is handed back.
    #[error("display command queue full")]
    Full(DisplayCommand),
}

/// Bounded multi-producer queue, single consumer (the device main loop).
pub struct CommandQueue<const N: usize = COMMAND_DEPTH> {
    channel: Channel<CriticalSectionRawMutex, DisplayCommand, N>,
    attached: Mutex<Cell<bool>>,
}

impl<const N: usize> CommandQueue<N> {
    /// Empty queue with no display attached, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            attached: Mutex::new(Cell::new(false)),
        }
    }

    /// Mark whether a display consumes this queue.
    pub fn set_attached(&self, attached: bool) {
        critical_section::with(|cs| self.attached.borrow(cs).set(attached));
        if !attached {
            self.channel.clear();
        }
    }

    /// `true` while a display consumes this queue.
    pub fn is_attached(&self) -> bool {
        critical_section::with(|cs| self.attached.borrow(cs).get())
    }

    /// Post `command` without blocking.
    pub fn post(&self, command: DisplayCommand) -> Result<(), EnqueueError> {
        if !self.is_attached() {
            return Err(EnqueueError::DisplayUnused);
        }
        self.channel.try_send(command).map_err(|TrySendError::Full(c)| {
            warn!("display command queue full, dropping {}", c);
            EnqueueError::Full(c)
        })
    }

    /// Next command, if any.
    pub fn take(&self) -> Option<DisplayCommand> {
        self.channel.try_receive().ok()
    }

    /// Commands waiting.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// Nothing waiting.
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_log_readably() {
        assert_eq!(
            format!("{}", DisplayCommand::Refresh(UpdateType::Full)),
            "full refresh"
        );
        assert_eq!(
            format!("{}", DisplayCommand::Input(InputEvent::AuxUp)),
            "input (aux up)"
        );
        assert_eq!(format!("{}", DisplayCommand::NewData { source: 3 }), "new data from 3");
    }

    #[test]
    fn test_unused_display_short_circuits() {
        let q: CommandQueue<2> = CommandQueue::new();
        assert_eq!(q.post(DisplayCommand::Wake), Err(EnqueueError::DisplayUnused));
        assert!(q.is_empty());
    }

    #[test]
    fn test_full_queue_hands_command_back() {
        let q: CommandQueue<2> = CommandQueue::new();
        q.set_attached(true);
        assert!(q.post(DisplayCommand::NewData { source: 1 }).is_ok());
        assert!(q.post(DisplayCommand::NewData { source: 2 }).is_ok());
        assert_eq!(
            q.post(DisplayCommand::ClockTick { epoch: 7 }),
            Err(EnqueueError::Full(DisplayCommand::ClockTick { epoch: 7 }))
        );
        assert_eq!(q.take(), Some(DisplayCommand::NewData { source: 1 }));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_detach_discards_pending() {
        let q: CommandQueue<4> = CommandQueue::new();
        q.set_attached(true);
        q.post(DisplayCommand::PrepareSleep).ok();
        q.set_attached(false);
        assert_eq!(q.take(), None);
    }
}
