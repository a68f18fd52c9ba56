//! Candidate identity and tally record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Timestamp, TypeError};

/// Store-assigned candidate identifier. Ids start at 1 and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(u64);

impl CandidateId {
    /// The first id a fresh store hands out.
    pub const FIRST: Self = Self(1);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id allocated after this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Big-endian key bytes, so that byte order equals numeric order.
    pub fn to_key(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_key(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 8] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(arr)))
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CandidateId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| TypeError::InvalidCandidateId(s.to_string()))?;
        if raw == 0 {
            return Err(TypeError::InvalidCandidateId(s.to_string()));
        }
        Ok(Self(raw))
    }
}

/// A candidate and its cumulative vote count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    /// Only ever incremented, and only inside a vote-casting transaction.
    pub vote_count: u64,
    pub created_at: Timestamp,
}

impl Candidate {
    /// Build a fresh candidate with a zero tally.
    pub fn new(id: CandidateId, name: &str, created_at: Timestamp) -> Result<Self, TypeError> {
        Ok(Self {
            id,
            name: validate_name(name)?,
            vote_count: 0,
            created_at,
        })
    }
}

/// Trim a candidate name and reject it if nothing is left.
pub fn validate_name(name: &str) -> Result<String, TypeError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TypeError::EmptyName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_zero_and_garbage() {
        assert!("0".parse::<CandidateId>().is_err());
        assert!("-1".parse::<CandidateId>().is_err());
        assert!("one".parse::<CandidateId>().is_err());
        assert_eq!("7".parse::<CandidateId>().unwrap(), CandidateId::new(7));
    }

    #[test]
    fn key_order_matches_numeric_order() {
        let small = CandidateId::new(2).to_key();
        let large = CandidateId::new(256).to_key();
        assert!(small < large);
        assert_eq!(CandidateId::from_key(&large), Some(CandidateId::new(256)));
        assert_eq!(CandidateId::from_key(&[1, 2, 3]), None);
    }

    #[test]
    fn new_candidate_starts_at_zero() {
        let c = Candidate::new(CandidateId::FIRST, " Alice ", Timestamp::new(10)).unwrap();
        assert_eq!(c.name, "Alice");
        assert_eq!(c.vote_count, 0);
        assert_eq!(
            Candidate::new(CandidateId::FIRST, "  ", Timestamp::EPOCH),
            Err(TypeError::EmptyName)
        );
    }
}
