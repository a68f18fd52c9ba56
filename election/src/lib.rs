//! Elections over a transactional store.
//!
//! Voters register, get authorized, and cast exactly one vote each. The
//! crate is split the way the data is:
//!
//! - [`VoterRegistry`]: registration, authorization, eligibility reads.
//! - [`CandidateLedger`]: candidates and their vote counts.
//! - [`VotingEngine`]: the cast protocol. An eligibility read, then one
//!   write transaction that re-checks eligibility, bumps the candidate's
//!   count and marks the voter, committing all of it or none of it.
//! - [`ResultReporter`]: read-only tallies, summaries and audits.
//!
//! [`Election`] bundles all four over one injected [`VotingStore`].
//!
//! [`VotingStore`]: ballot_store::VotingStore

pub mod candidates;
pub mod deadline;
pub mod election;
pub mod engine;
pub mod error;
pub mod registry;
pub mod reporter;
pub mod stats;

pub use candidates::CandidateLedger;
pub use deadline::{CancelToken, Deadline};
pub use election::{Election, ElectionInfo};
pub use engine::VotingEngine;
pub use error::{ElectionError, ErrorKind};
pub use registry::VoterRegistry;
pub use reporter::{render_results, AuditReport, ElectionSummary, ResultReporter, TallyEntry, TallyMismatch};
pub use stats::{CastStats, EngineStats};
