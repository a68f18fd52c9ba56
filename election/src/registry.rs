//! Voter registry: registration, authorization and eligibility reads.

use std::sync::Arc;

use ballot_store::{VoterReader, VoterWriter, VotingStore, WriteTxn};
use ballot_types::{Clock, Voter, VoterAddress, VoterStatus};
use tracing::{debug, info};

use crate::candidates::retire_vote_in;
use crate::{Deadline, ElectionError};

pub struct VoterRegistry<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: VotingStore> VoterRegistry<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Register `address`, or re-register it.
    ///
    /// Always writes a fresh record: unauthorized, not voted, no vote. If
    /// the previous record had voted, the candidate's count is left alone
    /// and the vote is moved to the candidate's retired counter in the same
    /// transaction.
    pub fn register(&self, address: &VoterAddress, deadline: &Deadline) -> Result<(), ElectionError> {
        deadline.check()?;
        let mut txn = self.store.write_txn()?;
        let previous = txn.get_voter(address)?;
        let retired = previous.as_ref().and_then(|v| v.vote);
        if let Some(candidate) = retired {
            retire_vote_in(&mut txn, candidate)?;
        }
        txn.put_voter(&Voter::registered(address.clone(), self.clock.now()))?;
        deadline.check()?;
        txn.commit()?;

        info!(
            voter = %address,
            reregistered = previous.is_some(),
            retired_vote = ?retired,
            "voter registered"
        );
        Ok(())
    }

    /// Allow a registered voter to vote. Authorizing twice is a no-op.
    ///
    /// Fails with [`ElectionError::VoterNotFound`] for an address that was
    /// never registered; nothing is written in that case.
    pub fn authorize(&self, address: &VoterAddress, deadline: &Deadline) -> Result<(), ElectionError> {
        deadline.check()?;
        let mut txn = self.store.write_txn()?;
        let mut voter = txn
            .get_voter(address)?
            .ok_or_else(|| ElectionError::VoterNotFound(address.clone()))?;
        if voter.authorized {
            debug!(voter = %address, "voter already authorized");
            return Ok(());
        }
        voter.authorized = true;
        txn.put_voter(&voter)?;
        deadline.check()?;
        txn.commit()?;

        info!(voter = %address, "voter authorized");
        Ok(())
    }

    /// Eligibility flags of a registered voter.
    pub fn status(&self, address: &VoterAddress, deadline: &Deadline) -> Result<VoterStatus, ElectionError> {
        self.voter(address, deadline).map(|v| v.status())
    }

    /// The full record of a registered voter.
    pub fn voter(&self, address: &VoterAddress, deadline: &Deadline) -> Result<Voter, ElectionError> {
        deadline.check()?;
        let txn = self.store.read_txn()?;
        txn.get_voter(address)?
            .ok_or_else(|| ElectionError::VoterNotFound(address.clone()))
    }

    pub fn voter_count(&self, deadline: &Deadline) -> Result<u64, ElectionError> {
        deadline.check()?;
        Ok(self.store.read_txn()?.voter_count()?)
    }
}

/// Reject a cast by `voter` unless it is authorized and has not voted.
///
/// Checked once against committed state and again inside the cast's write
/// transaction.
pub(crate) fn ensure_eligible(voter: &Voter) -> Result<(), ElectionError> {
    if !voter.authorized {
        return Err(ElectionError::NotAuthorized(voter.address.clone()));
    }
    if voter.voted {
        return Err(ElectionError::AlreadyVoted(voter.address.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_nullables::{NullClock, NullStore};
    use ballot_types::Timestamp;

    fn registry() -> (Arc<NullStore>, Arc<NullClock>, VoterRegistry<NullStore>) {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(1_000));
        let registry = VoterRegistry::new(Arc::clone(&store), clock.clone());
        (store, clock, registry)
    }

    fn addr(raw: &str) -> VoterAddress {
        VoterAddress::parse(raw).unwrap()
    }

    #[test]
    fn register_then_status() {
        let (_store, _clock, registry) = registry();
        registry.register(&addr("0xA"), &Deadline::none()).unwrap();
        let status = registry.status(&addr("0xA"), &Deadline::none()).unwrap();
        assert!(!status.authorized);
        assert!(!status.voted);
    }

    #[test]
    fn status_of_unknown_voter_is_not_found() {
        let (_store, _clock, registry) = registry();
        let err = registry.status(&addr("0xZ"), &Deadline::none()).unwrap_err();
        assert!(matches!(err, ElectionError::VoterNotFound(_)));
    }

    #[test]
    fn authorize_is_idempotent() {
        let (store, _clock, registry) = registry();
        registry.register(&addr("0xA"), &Deadline::none()).unwrap();
        registry.authorize(&addr("0xA"), &Deadline::none()).unwrap();
        let commits = store.commit_count();
        registry.authorize(&addr("0xA"), &Deadline::none()).unwrap();
        assert_eq!(store.commit_count(), commits);
        assert!(registry.status(&addr("0xA"), &Deadline::none()).unwrap().authorized);
    }

    #[test]
    fn authorize_unknown_voter_fails_without_creating_it() {
        let (_store, _clock, registry) = registry();
        let err = registry.authorize(&addr("0xGhost"), &Deadline::none()).unwrap_err();
        assert!(matches!(err, ElectionError::VoterNotFound(_)));
        assert_eq!(registry.voter_count(&Deadline::none()).unwrap(), 0);
    }

    #[test]
    fn reregistration_resets_and_refreshes_timestamp() {
        let (_store, clock, registry) = registry();
        registry.register(&addr("0xA"), &Deadline::none()).unwrap();
        registry.authorize(&addr("0xA"), &Deadline::none()).unwrap();
        clock.advance(60);
        registry.register(&addr("0xA"), &Deadline::none()).unwrap();

        let voter = registry.voter(&addr("0xA"), &Deadline::none()).unwrap();
        assert!(!voter.authorized);
        assert_eq!(voter.registered_at, Timestamp::new(1_060));
        assert_eq!(registry.voter_count(&Deadline::none()).unwrap(), 1);
    }

    #[test]
    fn reregistration_after_voting_retires_the_vote() {
        let (store, _clock, registry) = registry();
        let mut voted = Voter::registered(addr("0xA"), Timestamp::EPOCH);
        voted.authorized = true;
        voted.mark_voted(ballot_types::CandidateId::new(3));
        let mut txn = store.write_txn().unwrap();
        txn.put_voter(&voted).unwrap();
        txn.commit().unwrap();

        registry.register(&addr("0xA"), &Deadline::none()).unwrap();

        let voter = registry.voter(&addr("0xA"), &Deadline::none()).unwrap();
        assert!(!voter.voted);
        assert_eq!(voter.vote, None);
        let rtxn = store.read_txn().unwrap();
        assert_eq!(
            crate::candidates::retired_votes(&rtxn, ballot_types::CandidateId::new(3)).unwrap(),
            1
        );
    }

    #[test]
    fn eligibility_order() {
        let mut voter = Voter::registered(addr("0xA"), Timestamp::EPOCH);
        assert!(matches!(ensure_eligible(&voter), Err(ElectionError::NotAuthorized(_))));
        voter.authorized = true;
        assert!(ensure_eligible(&voter).is_ok());
        voter.mark_voted(ballot_types::CandidateId::FIRST);
        assert!(matches!(ensure_eligible(&voter), Err(ElectionError::AlreadyVoted(_))));
    }
}
