use thiserror::Error;

/// Errors raised while persisting or reading the Q&A store.
///
/// Parse failures are not listed here: a store that does not parse is
/// re-initialized instead of reported.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the store failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The exclusive lock could not be acquired.
    #[error("Lock error: {0}")]
    Lock(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),
}
