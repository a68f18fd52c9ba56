//! Candidate ledger: candidate records and their vote counts.

use std::sync::Arc;

use ballot_store::{CandidateReader, CandidateWriter, MetaReader, VotingStore, WriteTxn};
use ballot_types::candidate::validate_name;
use ballot_types::{Candidate, CandidateId, Clock};
use tracing::info;

use crate::{Deadline, ElectionError};

pub struct CandidateLedger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: VotingStore> CandidateLedger<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a candidate with a zero count and return its new id.
    ///
    /// Names are trimmed; an empty name is an `InvalidArgument`. Duplicate
    /// names are allowed, candidates are told apart by id.
    pub fn add(&self, name: &str, deadline: &Deadline) -> Result<CandidateId, ElectionError> {
        let name = validate_name(name)?;
        deadline.check()?;

        let mut txn = self.store.write_txn()?;
        let id = txn.allocate_candidate_id()?;
        txn.put_candidate(&Candidate::new(id, &name, self.clock.now())?)?;
        deadline.check()?;
        txn.commit()?;

        info!(candidate = %id, name = %name, "candidate added");
        Ok(id)
    }

    pub fn get(&self, id: CandidateId, deadline: &Deadline) -> Result<Candidate, ElectionError> {
        deadline.check()?;
        let txn = self.store.read_txn()?;
        txn.get_candidate(id)?
            .ok_or(ElectionError::CandidateNotFound(id))
    }

    /// All candidates in ascending id order, as last committed.
    pub fn list_all(&self, deadline: &Deadline) -> Result<Vec<Candidate>, ElectionError> {
        deadline.check()?;
        Ok(self.store.read_txn()?.iter_candidates()?)
    }
}

/// Add one vote to candidate `id` inside the caller's transaction and
/// return the new count.
///
/// Kept crate-private: the only legitimate caller is the voting engine,
/// which pairs every increment with marking a voter.
pub(crate) fn increment_in<T: WriteTxn>(txn: &mut T, id: CandidateId) -> Result<u64, ElectionError> {
    let mut candidate = txn
        .get_candidate(id)?
        .ok_or(ElectionError::CandidateNotFound(id))?;
    candidate.vote_count = candidate
        .vote_count
        .checked_add(1)
        .ok_or_else(|| ElectionError::Corrupted(format!("vote count overflow for candidate {id}")))?;
    txn.put_candidate(&candidate)?;
    Ok(candidate.vote_count)
}

/// Meta key holding how many of candidate `id`'s votes were cast by voters
/// who later re-registered.
fn retired_key(id: CandidateId) -> String {
    format!("retired_votes/{id}")
}

/// Votes counted for `id` whose voter record has since been reset.
pub(crate) fn retired_votes<R: MetaReader + ?Sized>(txn: &R, id: CandidateId) -> Result<u64, ElectionError> {
    match txn.get_meta(&retired_key(id))? {
        None => Ok(0),
        Some(bytes) => {
            let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                ElectionError::Corrupted(format!("retired vote counter for {id} has {} bytes", bytes.len()))
            })?;
            Ok(u64::from_le_bytes(raw))
        }
    }
}

/// Record that one of `id`'s counted votes no longer has a voter behind it.
///
/// Counts never go down; re-registration moves the vote from the voter
/// table to this counter so the tally stays auditable.
pub(crate) fn retire_vote_in<T: WriteTxn>(txn: &mut T, id: CandidateId) -> Result<(), ElectionError> {
    let retired = retired_votes(&*txn, id)?
        .checked_add(1)
        .ok_or_else(|| ElectionError::Corrupted(format!("retired vote overflow for candidate {id}")))?;
    txn.put_meta(&retired_key(id), &retired.to_le_bytes())?;
    Ok(())
}
