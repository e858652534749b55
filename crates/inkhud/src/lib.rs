//! InkHUD: tiled applet compositor for small e-ink panels
//!
//! Multiplexes independent applets onto one, two or four screen tiles,
//! coordinates the panel's slow refresh hardware, and maps button gestures
//! to navigation.
//!
//! ```text
//! Applet ──pixels──▶ Tile (offset + crop) ──▶ ImageBuffer (rotation)
//!                                                │
//! WindowManager ── health policy ── RefreshTracker ──▶ EInkDriver
//! ```
//!
//! # Modules
//!
//! - [`window_manager`] - registry, layout, refresh scheduling, navigation
//! - [`applet`] / [`canvas`] - applet lifecycle and the drawing toolkit
//! - [`tile`] - layout math, coordinate translation, cropping
//! - [`health`] / [`refresh`] - FAST/FULL policy and the refresh state machine
//! - [`events`] / [`notification`] - typed events and notification content
//! - [`settings`] - persisted user settings
//! - [`applets`] - built-in system and user applets
//!
//! # Features
//!
//! - `defmt`: log through defmt (hardware)
//! - `tracing`: log through tracing (desktop, tests)
//! - `std`: nothing extra yet; forwarded by the firmware's host builds

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
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)] // pixel math in f32 for relative positions

// fmt must come first so its macros are visible to every module below.
mod fmt;

pub mod applet;
pub mod applets;
pub mod canvas;
pub mod events;
pub mod font;
pub mod health;
pub mod image;
pub mod notification;
pub mod refresh;
pub mod rotation;
pub mod settings;
pub mod signal;
pub mod tile;
pub mod time;
pub mod window_manager;

pub use applet::{Applet, AppletCore, AppletId, Lifecycle, RefreshRequest, RenderContext, Scope, MAX_APPLETS};
pub use canvas::{Canvas, Color, Crop, DrawingState, HAlign, VAlign, BLACK, WHITE};
pub use events::{Event, EventBus, NodeHeard, TextMessage, Topic, Topics};
pub use font::{AppletFont, FontSet};
pub use health::{DisplayHealth, Resilience};
pub use image::ImageBuffer;
pub use notification::{Notification, NotificationKind};
pub use refresh::{PollOutcome, RefreshState, RefreshTracker};
pub use rotation::Rotation;
pub use settings::{Settings, SettingsError};
pub use signal::SignalStrength;
pub use tile::{LayoutError, Tile, TileId, TileKind, MAX_USER_TILES, TILE_SPACING};
pub use window_manager::{RunOutcome, WindowManager, WindowManagerError};
