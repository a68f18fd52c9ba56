//! Fundamental types for the ballot system.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: voter addresses, candidate ids, the voter and candidate
//! records themselves, and timestamps.

pub mod address;
pub mod candidate;
pub mod error;
pub mod time;
pub mod voter;

pub use address::VoterAddress;
pub use candidate::{Candidate, CandidateId};
pub use error::TypeError;
pub use time::{Clock, SystemClock, Timestamp};
pub use voter::{Voter, VoterStatus};
