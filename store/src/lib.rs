//! Abstract storage traits for the ballot system.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! All access goes through a transaction. A [`ReadTxn`] sees one consistent
//! snapshot; a [`WriteTxn`] applies all of its writes on [`WriteTxn::commit`]
//! or none of them when dropped.

pub mod candidate;
pub mod error;
pub mod meta;
pub mod transaction;
pub mod voter;

pub use candidate::{CandidateReader, CandidateWriter};
pub use error::StoreError;
pub use meta::{MetaReader, MetaWriter, SCHEMA_VERSION_KEY};
pub use transaction::{ReadTxn, VotingStore, WriteTxn};
pub use voter::{VoterReader, VoterWriter};
