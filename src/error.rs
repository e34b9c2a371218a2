use thiserror::Error;

/// Typed failures surfaced by the engine. Everything else is handled
/// locally (skipped and logged) per the recovery policy.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),

    #[error("malformed sort key: {0}")]
    BadSortKey(String),

    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    #[error("unknown record field: {0}")]
    UnknownField(String),

    #[error("unknown delete scope: {0}")]
    UnknownScope(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    #[error("duplicate record id: {0}")]
    DuplicateRecord(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl CoreError {
    /// Stable error code for the IPC surface.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::UnknownSortField(_) | CoreError::BadSortKey(_) => "bad_sort_key",
            CoreError::UnknownPartition(_)
            | CoreError::UnknownField(_)
            | CoreError::UnknownScope(_) => "bad_params",
            CoreError::RecordNotFound(_) | CoreError::OwnerNotFound(_) => "not_found",
            CoreError::DuplicateRecord(_) => "conflict",
            CoreError::Store(_) => "db_query_failed",
        }
    }
}
