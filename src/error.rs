/// Error types for the showcase engine
///
/// Only operations that touch storage, files or serialized data can fail.
/// The catalog, deck and gate state machines report their outcomes through
/// explicit return values instead.

use thiserror::Error;

/// Result type for fallible showcase operations
pub type Result<T> = std::result::Result<T, ShowcaseError>;

/// Errors that can occur while loading or persisting showcase data
#[derive(Error, Debug)]
pub enum ShowcaseError {
    /// SQLite preference storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listing data violates the catalog invariants
    #[error("Invalid listing data: {0}")]
    InvalidListings(String),

    /// Neither a data directory nor a home directory could be resolved
    #[error("Could not determine user data directory")]
    NoDataDir,

    /// Neither a config directory nor a home directory could be resolved
    #[error("Could not determine user config directory")]
    NoConfigDir,
}
