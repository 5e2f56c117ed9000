use thiserror::Error;

/// Errors produced by the store layer. Every variant is a backend fault:
/// a missing secret is `Ok(None)`, never an error.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the data directory or key file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Hex decoding error (device key file).
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The device key file exists but is not a 32-byte key.
    #[error("Device key is malformed")]
    MalformedDeviceKey,

    /// Unexpected backend failure: sealing failed, a stored value did not
    /// authenticate, or a lock was poisoned.
    #[error("Secret store fault: {0}")]
    BackendFault(String),

    /// A stored value was expected to be UTF-8 text.
    #[error("Stored secret is not valid UTF-8")]
    InvalidUtf8,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
