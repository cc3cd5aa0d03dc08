/// Errors that can occur within the storage layer.
///
/// The [`HostStore`](ercole_engine::ports::HostStore) implementation returns
/// `anyhow::Result`, so these convert transparently at the port boundary.
///
/// # Examples
///
/// ```rust
/// use ercole_storage::error::StorageError;
///
/// let err = StorageError::CorruptPayload {
///     id: "42".to_string(),
///     source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
/// };
/// assert!(err.to_string().contains("id=42"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The hostdata could not be serialized into the payload column.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored payload no longer decodes as hostdata.
    #[error("Storage: corrupt payload for hostdata (id={id}): {source}")]
    CorruptPayload {
        id: String,
        source: serde_json::Error,
    },

    /// The data directory could not be created.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
