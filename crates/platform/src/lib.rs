//! Hardware Abstraction Layer (HAL) for the InkHUD e-ink compositor
//!
//! This crate provides trait-based abstractions for the hardware the
//! compositor touches, enabling development and testing without physical
//! hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Compositor (inkhud crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Board support (HAL + PAC)
//! ```
//!
//! # Capabilities
//!
//! - [`EInkDriver`] - begin / update / poll for an e-ink panel
//! - [`InterruptPin`] - button lines with interrupt attach / detach
//! - [`InputHandler`] - receiver of debounced navigation gestures
//! - [`SettingsStore`] - opaque settings blob persistence
//! - [`Clock`] / [`Rtc`] - monotonic and wall-clock time
//!
//! # Features
//!
//! - `std`: Enable the [`mocks`] module (for testing)
//! - `defmt`: Enable defmt logging derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod clock;
pub mod config;
pub mod display;
pub mod gpio;
pub mod input;
pub mod mocks;
pub mod storage;

pub use clock::{Clock, EmbassyClock, Rtc};
pub use display::{image_len, DisplayError, EInkDriver, PollTiming, UpdateType};
pub use gpio::{InterruptMode, InterruptPin, PinState, Pull, WiringType};
pub use input::{InputEvent, InputHandler};
pub use storage::{SettingsStore, StorageError};
