use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    /// The backend ran out of space or of a fixed-size resource.
    #[error("storage capacity exhausted: {0}")]
    Capacity(String),

    /// An optimistic transaction lost a race with a concurrent writer.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// The backend is temporarily unable to serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether retrying the whole operation unchanged may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}
