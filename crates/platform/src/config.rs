//! Application-wide constants.

/// Application display name, shown in the menu header.
pub const APP_NAME: &str = "InkHUD";

/// Application version (from Cargo package version)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default debounce window for button lines, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Hold time that turns a main-button press into a long press, in milliseconds.
pub const DEFAULT_LONG_PRESS_MS: u64 = 500;

/// Poll period while waiting for a held button to be released, in milliseconds.
pub const RELEASE_POLL_MS: u64 = 10;

/// Largest settings blob the compositor will read or write.
pub const SETTINGS_BLOB_MAX: usize = 128;
