use thiserror::Error;

/// Errors from the hosted database layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network unreachable, timed out, or the gateway is down.
    #[error("Backend unreachable: {0}")]
    Connectivity(String),

    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A response or row did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No {table} row with id {id}")]
    NotFound { table: String, id: String },

    #[error("Read cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the failure means "offline", not "the request was wrong".
    /// The refresh loop skips the cycle instead of reporting an error.
    pub fn is_connectivity_error(&self) -> bool {
        match self {
            StoreError::Connectivity(_) => true,
            StoreError::Api { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure modes of mark-as-read. In both cases nothing was written locally
/// and the item stays on the agenda, so the user can retry.
#[derive(Debug, Error)]
pub enum MarkReadError {
    #[error("Cannot mark as read: not signed in")]
    Unauthenticated,

    #[error("Could not save read state: {0}")]
    Persistence(#[from] StoreError),
}

impl MarkReadError {
    pub fn code(&self) -> &'static str {
        match self {
            MarkReadError::Unauthenticated => "UNAUTHENTICATED",
            MarkReadError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}
