//! Voter registry storage traits.

use ballot_types::{Voter, VoterAddress};

use crate::StoreError;

/// Read access to voter records.
pub trait VoterReader {
    /// Look up a voter. `Ok(None)` means the address was never registered.
    fn get_voter(&self, address: &VoterAddress) -> Result<Option<Voter>, StoreError>;

    /// Number of registered voters.
    fn voter_count(&self) -> Result<u64, StoreError>;

    /// All voters, ordered by address.
    fn iter_voters(&self) -> Result<Vec<Voter>, StoreError>;
}

/// Write access to voter records.
pub trait VoterWriter: VoterReader {
    /// Insert or overwrite the record keyed by `voter.address`.
    fn put_voter(&mut self, voter: &Voter) -> Result<(), StoreError>;
}
