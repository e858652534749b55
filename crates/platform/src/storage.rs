//! Settings persistence collaborator.
//!
//! The compositor stores one opaque blob. Where and how it lands in flash is
//! the implementor's business.

/// Blob store for persisted settings.
pub trait SettingsStore {
    /// Error type
    type Error: core::fmt::Debug;

    /// Copy the stored blob into `buf`.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet, otherwise the
    /// number of bytes written into `buf`.
    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Replace the stored blob.
    fn store(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Blob does not fit the backing area or the caller's buffer.
    #[error("settings blob too large")]
    TooLarge,
    /// Underlying medium failed.
    #[error("storage medium error")]
    Medium,
}
