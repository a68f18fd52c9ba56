//! The vote-casting protocol.
//!
//! A cast runs in two steps:
//!
//! 1. **Eligibility check** against committed state, in a read transaction:
//!    the voter must exist, be authorized, and not have voted.
//! 2. **Atomic mutation** in one write transaction: re-read the voter and
//!    repeat the eligibility check, increment the candidate's count, mark
//!    the voter as voted for that candidate, commit.
//!
//! The re-check in step 2 is what makes the cast safe under concurrency: the
//! write transaction only commits if the voter it read is still eligible at
//! commit time. Backends that serialize writers (LMDB) evaluate it under
//! exclusion; optimistic backends reject the commit with a conflict when a
//! concurrent cast changed the voter first. Any early return drops the write
//! transaction uncommitted, so a failed cast changes nothing.

use std::sync::Arc;

use ballot_store::{VoterReader, VoterWriter, VotingStore, WriteTxn};
use ballot_types::{CandidateId, VoterAddress};
use tracing::{debug, info, warn};

use crate::candidates::increment_in;
use crate::registry::ensure_eligible;
use crate::stats::{CastStats, EngineStats};
use crate::{Deadline, ElectionError};

pub struct VotingEngine<S> {
    store: Arc<S>,
    stats: EngineStats,
}

impl<S: VotingStore> VotingEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            stats: EngineStats::new(),
        }
    }

    /// Cast `address`'s single vote for `candidate`.
    ///
    /// On success the candidate's count went up by exactly one and the voter
    /// is marked as having voted for it, both in the same commit. On any
    /// error neither happened.
    pub fn cast_vote(
        &self,
        address: &VoterAddress,
        candidate: CandidateId,
        deadline: &Deadline,
    ) -> Result<(), ElectionError> {
        let outcome = self.try_cast(address, candidate, deadline);
        self.stats.record(&outcome);
        debug!(stats = ?self.stats.snapshot(), "cast stats");

        match &outcome {
            Ok(()) => {}
            Err(e) if e.is_retryable() => {
                warn!(voter = %address, candidate = %candidate, error = %e, "vote not committed, retryable");
            }
            Err(e) => {
                info!(voter = %address, candidate = %candidate, error = %e, "vote rejected");
            }
        }
        outcome
    }

    pub fn stats(&self) -> CastStats {
        self.stats.snapshot()
    }

    fn try_cast(
        &self,
        address: &VoterAddress,
        candidate: CandidateId,
        deadline: &Deadline,
    ) -> Result<(), ElectionError> {
        deadline.check()?;

        // Step 1: eligibility against committed state.
        {
            let txn = self.store.read_txn()?;
            let voter = txn
                .get_voter(address)?
                .ok_or_else(|| ElectionError::VoterNotFound(address.clone()))?;
            ensure_eligible(&voter)?;
        }
        deadline.check()?;

        // Step 2: everything below commits together or not at all.
        let mut txn = self.store.write_txn()?;
        let mut voter = txn
            .get_voter(address)?
            .ok_or_else(|| ElectionError::VoterNotFound(address.clone()))?;
        ensure_eligible(&voter)?;

        let new_count = increment_in(&mut txn, candidate)?;
        deadline.check()?;

        voter.mark_voted(candidate);
        txn.put_voter(&voter)?;
        deadline.check()?;

        txn.commit()?;

        info!(voter = %address, candidate = %candidate, new_count, "vote cast");
        Ok(())
    }
}
