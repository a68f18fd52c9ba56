//! Read-only views over committed state: tallies, summaries, audits.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use ballot_store::{CandidateReader, VoterReader, VotingStore};
use ballot_types::{CandidateId, VoterAddress};
use serde::Serialize;
use tracing::{debug, warn};

use crate::candidates::retired_votes;
use crate::{Deadline, ElectionError};

/// One line of a tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub name: String,
    pub vote_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ElectionSummary {
    pub candidates: u64,
    pub total_votes: u64,
    pub registered_voters: u64,
    pub authorized_voters: u64,
    pub voters_voted: u64,
}

/// A candidate whose stored count disagrees with the votes behind it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TallyMismatch {
    pub candidate: CandidateId,
    pub name: String,
    pub recorded: u64,
    /// Votes held by current voter records plus retired votes.
    pub counted: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub mismatches: Vec<TallyMismatch>,
    /// Voters marked as voted whose vote names no existing candidate.
    pub dangling_votes: Vec<VoterAddress>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.dangling_votes.is_empty()
    }
}

pub struct ResultReporter<S> {
    store: Arc<S>,
}

impl<S: VotingStore> ResultReporter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Vote counts by candidate, in id order, as last committed.
    pub fn tally(&self, deadline: &Deadline) -> Result<Vec<TallyEntry>, ElectionError> {
        deadline.check()?;
        let candidates = self.store.read_txn()?.iter_candidates()?;
        debug!(candidates = candidates.len(), "tally read");
        Ok(candidates
            .into_iter()
            .map(|c| TallyEntry {
                name: c.name,
                vote_count: c.vote_count,
            })
            .collect())
    }

    /// Totals over one consistent snapshot.
    pub fn summary(&self, deadline: &Deadline) -> Result<ElectionSummary, ElectionError> {
        deadline.check()?;
        let txn = self.store.read_txn()?;
        let candidates = txn.iter_candidates()?;
        let voters = txn.iter_voters()?;

        let mut total_votes = 0u64;
        for c in &candidates {
            total_votes = total_votes
                .checked_add(c.vote_count)
                .ok_or_else(|| ElectionError::Corrupted("total vote count overflow".into()))?;
        }
        Ok(ElectionSummary {
            candidates: candidates.len() as u64,
            total_votes,
            registered_voters: voters.len() as u64,
            authorized_voters: voters.iter().filter(|v| v.authorized).count() as u64,
            voters_voted: voters.iter().filter(|v| v.voted).count() as u64,
        })
    }

    /// Recount every candidate from the voter records and compare.
    pub fn audit(&self, deadline: &Deadline) -> Result<AuditReport, ElectionError> {
        deadline.check()?;
        let txn = self.store.read_txn()?;
        let candidates = txn.iter_candidates()?;

        let mut live: BTreeMap<CandidateId, u64> = BTreeMap::new();
        let mut report = AuditReport::default();
        for voter in txn.iter_voters()? {
            match (voter.voted, voter.vote) {
                (true, Some(id)) if candidates.iter().any(|c| c.id == id) => {
                    *live.entry(id).or_insert(0) += 1;
                }
                (true, _) => report.dangling_votes.push(voter.address),
                (false, _) => {}
            }
        }

        for c in candidates {
            let counted = live.get(&c.id).copied().unwrap_or(0) + retired_votes(&txn, c.id)?;
            if counted != c.vote_count {
                report.mismatches.push(TallyMismatch {
                    candidate: c.id,
                    name: c.name,
                    recorded: c.vote_count,
                    counted,
                });
            }
        }

        if !report.is_clean() {
            warn!(
                mismatches = report.mismatches.len(),
                dangling = report.dangling_votes.len(),
                "tally audit failed"
            );
        }
        Ok(report)
    }
}

/// Human-readable results, one `"<name>: <count> votes"` line per entry.
pub fn render_results(entries: &[TallyEntry], title: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(title) = title {
        let _ = writeln!(out, "{title}");
    }
    for entry in entries {
        let _ = writeln!(out, "{}: {} votes", entry.name, entry.vote_count);
    }
    out
}
