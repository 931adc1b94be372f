//! Error types for bucketkv
//!
//! Provides a unified error type for all operations, plus the coarse
//! [`ErrorKind`] classification clients branch on.

use thiserror::Error;

/// Result type alias using BucketKvError
pub type Result<T> = std::result::Result<T, BucketKvError>;

/// Unified error type for bucketkv operations
#[derive(Debug, Error)]
pub enum BucketKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL / Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    /// A bucket along the requested path does not exist
    #[error("Bucket not Found")]
    PathNotFound,

    /// The bucket targeted for deletion does not exist
    #[error("bucket not found")]
    BucketNotFound,

    #[error("Key not Found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    /// A key names a bucket where a value was expected, or the reverse
    #[error("incompatible value")]
    IncompatibleValue,

    #[error("key required")]
    KeyRequired,

    #[error("bucket name required")]
    BucketNameRequired,

    #[error("tx not writable")]
    TxNotWritable,

    #[error("timeout acquiring write transaction after {0} ms")]
    TransactionTimeout(u64),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error classes visible to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A bucket on the path, or the bucket being deleted, is missing
    BucketNotFound,

    /// The bucket resolved but the key is absent
    KeyNotFound,

    /// Any other storage engine failure
    Engine,
}

impl BucketKvError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BucketKvError::PathNotFound | BucketKvError::BucketNotFound => {
                ErrorKind::BucketNotFound
            }
            BucketKvError::KeyNotFound => ErrorKind::KeyNotFound,
            _ => ErrorKind::Engine,
        }
    }
}
