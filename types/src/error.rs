//! Validation errors raised when constructing core types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("voter address must not be empty")]
    EmptyAddress,

    #[error("voter address is {len} bytes, limit is {max}")]
    AddressTooLong { len: usize, max: usize },

    #[error("candidate name must not be empty")]
    EmptyName,

    #[error("malformed candidate id: {0}")]
    InvalidCandidateId(String),
}
