//! Store error types.

/// Errors that can occur when reading or writing the network store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A lock guarding a collection was poisoned by a panicking writer
    #[error("store collection poisoned: {collection}")]
    Poisoned { collection: &'static str },

    /// Reading or writing a snapshot file failed
    #[error("snapshot I/O error: {message}")]
    Io { message: String },

    /// A snapshot file could not be (de)serialised
    #[error("snapshot JSON error: {message}")]
    Json { message: String },
}
