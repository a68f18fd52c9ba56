//! Candidate ledger storage traits.

use ballot_types::{Candidate, CandidateId};

use crate::StoreError;

/// Read access to candidate records.
pub trait CandidateReader {
    /// Look up a candidate. `Ok(None)` means no such id was ever allocated.
    fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError>;

    /// All candidates in ascending id order.
    fn iter_candidates(&self) -> Result<Vec<Candidate>, StoreError>;

    fn candidate_count(&self) -> Result<u64, StoreError> {
        self.iter_candidates().map(|c| c.len() as u64)
    }
}

/// Write access to candidate records.
pub trait CandidateWriter: CandidateReader {
    /// Reserve the next unused candidate id.
    ///
    /// The reservation is part of the enclosing transaction: if it is rolled
    /// back, the id is handed out again.
    fn allocate_candidate_id(&mut self) -> Result<CandidateId, StoreError>;

    /// Insert or overwrite the record keyed by `candidate.id`.
    fn put_candidate(&mut self, candidate: &Candidate) -> Result<(), StoreError>;
}
