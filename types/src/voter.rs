//! Voter registry record.

use serde::{Deserialize, Serialize};

use crate::{CandidateId, Timestamp, VoterAddress};

/// One registered voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub address: VoterAddress,
    pub authorized: bool,
    pub voted: bool,
    /// The candidate this voter picked. `None` until a cast commits.
    pub vote: Option<CandidateId>,
    pub registered_at: Timestamp,
}

impl Voter {
    /// A freshly (re-)registered voter: unauthorized, not voted, no vote.
    ///
    /// Re-registration writes this record over any previous one, so it is
    /// also the reset state.
    pub fn registered(address: VoterAddress, now: Timestamp) -> Self {
        Self {
            address,
            authorized: false,
            voted: false,
            vote: None,
            registered_at: now,
        }
    }

    pub fn status(&self) -> VoterStatus {
        VoterStatus {
            authorized: self.authorized,
            voted: self.voted,
        }
    }

    /// Whether a cast by this voter may proceed right now.
    pub fn can_vote(&self) -> bool {
        self.authorized && !self.voted
    }

    /// Record a vote. Callers must have checked [`Voter::can_vote`].
    pub fn mark_voted(&mut self, candidate: CandidateId) {
        self.voted = true;
        self.vote = Some(candidate);
    }
}

/// The eligibility flags of a voter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub authorized: bool,
    pub voted: bool,
}
