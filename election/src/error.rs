use ballot_store::StoreError;
use ballot_types::{CandidateId, TypeError, VoterAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("voter {0} is not registered")]
    VoterNotFound(VoterAddress),

    #[error("candidate {0} does not exist")]
    CandidateNotFound(CandidateId),

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] TypeError),

    #[error("voter {0} is not authorized to vote")]
    NotAuthorized(VoterAddress),

    #[error("voter {0} has already voted")]
    AlreadyVoted(VoterAddress),

    #[error("transaction conflict, retry the operation: {0}")]
    TransactionConflict(String),

    #[error("store unavailable, retry later: {0}")]
    StoreUnavailable(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("stored data is corrupted: {0}")]
    Corrupted(String),

    /// A permanent backend failure, such as a full database.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

/// Coarse classification of an [`ElectionError`], for callers that only need
/// to decide between "try again" and "not permitted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The voter or candidate does not exist.
    NotFound,
    /// Empty name, blank address, malformed id.
    InvalidArgument,
    /// Not authorized, or already voted.
    PreconditionFailed,
    /// A concurrent mutation won the race.
    Conflict,
    /// Transient store failure.
    Unavailable,
    /// The caller's deadline passed or its token was cancelled.
    Cancelled,
    /// Stored state could not be decoded or violates an invariant.
    Internal,
}

impl ElectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VoterNotFound(_) | Self::CandidateNotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotAuthorized(_) | Self::AlreadyVoted(_) => ErrorKind::PreconditionFailed,
            Self::TransactionConflict(_) => ErrorKind::Conflict,
            Self::StoreUnavailable(_) => ErrorKind::Unavailable,
            Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Cancelled,
            Self::Corrupted(_) | Self::StorageFailure(_) => ErrorKind::Internal,
        }
    }

    /// Whether the whole operation may be retried unchanged.
    ///
    /// Everything else is a fixed precondition that retrying cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Unavailable)
    }
}

impl From<StoreError> for ElectionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => Self::TransactionConflict(msg),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Backend(msg) | StoreError::Capacity(msg) => Self::StorageFailure(msg),
            StoreError::Serialization(msg) | StoreError::Corruption(msg) => Self::Corrupted(msg),
            // Lookups return `Option`; a backend-level miss means the
            // store's own bookkeeping is broken.
            StoreError::NotFound(key) => Self::Corrupted(format!("missing key {key}")),
        }
    }
}
