use sea_orm::DbErr;

/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use edgealarm_storage::error::StorageError;
///
/// let err = StorageError::Conflict {
///     entity: "alarm_info",
///     key: "E1/0x01000003".to_string(),
/// };
/// assert!(err.is_conflict());
/// assert!(err.to_string().contains("alarm_info"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An insert violated a uniqueness constraint.
    #[error("Storage: {entity} conflicts with an existing row (key={key})")]
    Conflict { entity: &'static str, key: String },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Db(#[from] DbErr),

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

impl StorageError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
