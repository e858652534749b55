//! Firmware composition for a battery-powered e-ink radio device.
//!
//! Wires the [`inkhud`] compositor to real hardware and to the cooperative
//! main loop.
//!
//! # Architecture
//!
//! ```text
//! Interrupts (EdgeLatch, WakeFlags)     other tasks (CommandQueue)
//!              ↓                                  ↓
//!        Scheduler slots  ←── Device::tick ──→ DisplayCommand
//!              ↓
//! InputSource::service → WindowManager → Ssd16xx (EInkDriver)
//! ```
//!
//! # Modules
//!
//! - [`app`] - root device context and sleep hooks
//! - [`scheduler`] - cooperative slot table and interrupt wake flags
//! - [`input`] - debounced joystick and two-button sources
//! - [`commands`] - bounded display command queue
//! - [`display`] - SSD16xx panel driver
//!
//! # Features
//!
//! - `defmt` - log through defmt (hardware)
//! - `tracing` - log through tracing (desktop, tests, the headless demo)
//! - `std` - host builds; forwards to the platform mocks

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

// fmt must come first so its macros are visible to every module below.
mod fmt;

pub mod app;
pub mod commands;
pub mod display;
pub mod input;
pub mod scheduler;

pub use app::{input_slot, Device, DeviceError, CLOCK_SLOT, DISPLAY_SLOT};
pub use commands::{CommandQueue, DisplayCommand, EnqueueError};
pub use display::Ssd16xx;
pub use input::{InputBuilder, InputError, InputSource, IsrHandoff};
pub use scheduler::{Scheduler, SchedulerError, SlotId, Step, WakeFlags};
