//! Voter address type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// The identity a voter registers under.
///
/// Addresses are opaque strings chosen by the caller (`"0xA"`, an e-mail, a
/// wallet id). Surrounding whitespace is dropped on parse so that the same
/// identity typed twice maps to the same registry key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoterAddress(String);

impl VoterAddress {
    /// Longest accepted address in bytes. Addresses are used directly as
    /// storage keys, and LMDB caps keys at 511 bytes.
    pub const MAX_LEN: usize = 256;

    /// Parse and normalise a caller-supplied address.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyAddress);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TypeError::AddressTooLong {
                len: trimmed.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for VoterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VoterAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for VoterAddress {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}
