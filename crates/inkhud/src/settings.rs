//! Persisted user settings.
//!
//! Blob layout (all integers little-endian):
//!
//! ```text
//! [0..2]  magic     b"IH"
//! [2]     version   u8 = 1
//! [3..7]  checksum  u32, CRC32 of the payload
//! [7..]   payload   postcard-encoded `Settings`
//! ```
//!
//! Anything that fails to decode or validate falls back to
//! [`Settings::default`]; a bad blob never stops the display from starting.

use platform::config::SETTINGS_BLOB_MAX;
use platform::SettingsStore;
use serde::{Deserialize, Serialize};

use crate::applet::AppletId;
use crate::health::Resilience;
use crate::rotation::Rotation;
use crate::tile::MAX_USER_TILES;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Settings encode / decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Output buffer cannot hold the encoded blob.
    #[error("settings buffer too small")]
    BufferTooSmall,
    /// Magic bytes are not `b"IH"`.
    #[error("bad settings magic")]
    BadMagic,
    /// Version byte not understood.
    #[error("unsupported settings version")]
    UnsupportedVersion,
    /// Payload CRC does not match.
    #[error("settings checksum mismatch")]
    ChecksumMismatch,
    /// Postcard could not decode the payload.
    #[error("settings decode failed")]
    Decode,
    /// Decoded values are out of range.
    #[error("settings out of range")]
    InvalidValue,
    /// Storage collaborator failed.
    #[error("settings storage failed")]
    Storage,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User tile layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTiles {
    /// Upper limit offered by the layout menu: 1, 2 or 4.
    pub max_count: u8,
    /// Tiles in use: 1, 2 or 4.
    pub count: u8,
    /// Tile receiving button input.
    pub focused: u8,
    /// Applet shown on each tile, by registration index.
    pub displayed: [Option<u8>; MAX_USER_TILES],
}

impl Default for UserTiles {
    fn default() -> Self {
        Self {
            max_count: 4,
            count: 1,
            focused: 0,
            displayed: [None; MAX_USER_TILES],
        }
    }
}

/// Which applets run, and which may show themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppletSettings {
    /// Bit `n` set: applet `n` is active. `None` until the user first edits
    /// the selection, in which case registration autostart flags apply.
    pub active: Option<u32>,
    /// Bit `n` set: applet `n` may auto-show.
    pub autoshow: u32,
}

impl AppletSettings {
    /// Auto-show permission for `applet`.
    pub fn may_autoshow(&self, applet: AppletId) -> bool {
        self.autoshow & applet.mask() != 0
    }

    /// Flip auto-show permission for `applet`.
    pub fn toggle_autoshow(&mut self, applet: AppletId) {
        self.autoshow ^= applet.mask();
    }
}

/// Everything the user can change from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Tile layout
    pub user_tiles: UserTiles,
    /// Quarter turns clockwise, 0..=3.
    pub rotation: u8,
    /// Refresh health policy
    pub resilience: Resilience,
    /// Applet selection
    pub applets: AppletSettings,
    /// Show the notification bar for new messages.
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_tiles: UserTiles::default(),
            rotation: 0,
            resilience: Resilience::default(),
            applets: AppletSettings::default(),
            notifications_enabled: true,
        }
    }
}

/// Encoded blob, at most [`SETTINGS_BLOB_MAX`] bytes.
pub type SettingsBlob = heapless::Vec<u8, SETTINGS_BLOB_MAX>;

impl Settings {
    /// Blob magic
    pub const MAGIC: &'static [u8; 2] = b"IH";
    /// Blob version
    pub const VERSION: u8 = 1;
    /// Header bytes before the payload.
    pub const HEADER_LEN: usize = 7;

    /// Rotation as a typed value.
    pub fn rotation(&self) -> Rotation {
        Rotation::from_quarter_turns(self.rotation)
    }

    /// Reject values the compositor cannot lay out.
    ///
    /// # Errors
    ///
    /// [`SettingsError::InvalidValue`] for a tile count outside {1, 2, 4} or
    /// above `max_count`, a focus beyond the tile count, a rotation above 3,
    /// or a non-positive resilience setting.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let tiles = &self.user_tiles;
        let counts_ok = matches!(tiles.count, 1 | 2 | 4)
            && matches!(tiles.max_count, 1 | 2 | 4)
            && tiles.count <= tiles.max_count;
        let stress = self.resilience.stress_multiplier;
        if !counts_ok
            || tiles.focused >= tiles.count
            || self.rotation > 3
            || self.resilience.fast_per_full == 0
            || !stress.is_finite()
            || stress < 1.0
        {
            return Err(SettingsError::InvalidValue);
        }
        Ok(())
    }

    /// Encode into a framed blob.
    ///
    /// # Errors
    ///
    /// [`SettingsError::BufferTooSmall`] if the payload does not fit.
    #[allow(clippy::indexing_slicing)] // SAFETY: buf is SETTINGS_BLOB_MAX long, header ranges are constants below HEADER_LEN
    pub fn encode(&self) -> Result<SettingsBlob, SettingsError> {
        let mut buf = [0u8; SETTINGS_BLOB_MAX];
        let payload_len = postcard::to_slice(self, &mut buf[Self::HEADER_LEN..])
            .map_err(|_| SettingsError::BufferTooSmall)?
            .len();
        let end = Self::HEADER_LEN.saturating_add(payload_len);
        let crc = crc32fast::hash(&buf[Self::HEADER_LEN..end]);

        buf[0..2].copy_from_slice(Self::MAGIC);
        buf[2] = Self::VERSION;
        buf[3..7].copy_from_slice(&crc.to_le_bytes());

        SettingsBlob::from_slice(&buf[..end]).map_err(|_| SettingsError::BufferTooSmall)
    }

    /// Decode and validate a framed blob.
    ///
    /// # Errors
    ///
    /// Any framing, checksum, decode or range failure.
    pub fn decode(blob: &[u8]) -> Result<Self, SettingsError> {
        if blob.get(0..2) != Some(Self::MAGIC.as_ref()) {
            return Err(SettingsError::BadMagic);
        }
        if blob.get(2).copied() != Some(Self::VERSION) {
            return Err(SettingsError::UnsupportedVersion);
        }
        let crc_bytes: [u8; 4] = blob
            .get(3..Self::HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(SettingsError::Decode)?;
        let payload = blob.get(Self::HEADER_LEN..).ok_or(SettingsError::Decode)?;
        if crc32fast::hash(payload) != u32::from_le_bytes(crc_bytes) {
            return Err(SettingsError::ChecksumMismatch);
        }
        let settings: Self = postcard::from_bytes(payload).map_err(|_| SettingsError::Decode)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from `store`, falling back to defaults on any failure.
    pub fn load_or_default<S: SettingsStore>(store: &mut S) -> Self {
        let mut buf = [0u8; SETTINGS_BLOB_MAX];
        match store.load(&mut buf) {
            Ok(Some(len)) => match buf.get(..len).map(Self::decode) {
                Some(Ok(settings)) => {
                    info!("settings loaded ({} bytes)", len);
                    settings
                }
                Some(Err(e)) => {
                    warn!("settings invalid ({}), using defaults", e);
                    Self::default()
                }
                None => {
                    warn!("settings blob length {} out of range, using defaults", len);
                    Self::default()
                }
            },
            Ok(None) => {
                info!("no stored settings, using defaults");
                Self::default()
            }
            Err(_) => {
                warn!("settings storage unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Encode and write to `store`.
    ///
    /// # Errors
    ///
    /// Encoding failure or [`SettingsError::Storage`].
    pub fn save<S: SettingsStore>(&self, store: &mut S) -> Result<(), SettingsError> {
        let blob = self.encode()?;
        store.store(&blob).map_err(|_| SettingsError::Storage)?;
        debug!("settings saved ({} bytes)", blob.len());
        Ok(())
    }
}
