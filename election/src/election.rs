//! Caller-facing facade.
//!
//! Takes raw strings, parses them into domain types and hands off to the
//! components. Every call runs under a deadline derived from the configured
//! op timeout and cancel token.

use std::sync::Arc;
use std::time::Duration;

use ballot_store::{MetaReader, MetaWriter, VotingStore, WriteTxn};
use ballot_types::{Candidate, CandidateId, Clock, SystemClock, Voter, VoterAddress, VoterStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::reporter::{AuditReport, ElectionSummary, TallyEntry};
use crate::{
    render_results, CancelToken, CandidateLedger, CastStats, Deadline, ElectionError,
    ResultReporter, VoterRegistry, VotingEngine,
};

const ELECTION_INFO_KEY: &str = "election_info";

/// Name and owner of the election held by a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionInfo {
    pub name: String,
    pub owner: Option<VoterAddress>,
}

impl ElectionInfo {
    pub fn new(name: &str, owner: Option<&str>) -> Result<Self, ElectionError> {
        Ok(Self {
            name: ballot_types::candidate::validate_name(name)?,
            owner: owner.map(VoterAddress::parse).transpose()?,
        })
    }
}

pub struct Election<S> {
    store: Arc<S>,
    registry: VoterRegistry<S>,
    ledger: CandidateLedger<S>,
    engine: VotingEngine<S>,
    reporter: ResultReporter<S>,
    op_timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl<S: VotingStore> Election<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: VoterRegistry::new(Arc::clone(&store), Arc::clone(&clock)),
            ledger: CandidateLedger::new(Arc::clone(&store), clock),
            engine: VotingEngine::new(Arc::clone(&store)),
            reporter: ResultReporter::new(Arc::clone(&store)),
            store,
            op_timeout: None,
            cancel: None,
        }
    }

    /// Bound every facade call to `timeout` from its start.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    /// Fail every facade call once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn deadline(&self) -> Deadline {
        let deadline = match self.op_timeout {
            Some(timeout) => Deadline::after(timeout),
            None => Deadline::none(),
        };
        match &self.cancel {
            Some(token) => deadline.with_token(token.clone()),
            None => deadline,
        }
    }

    /// Store the election's name and owner, replacing any previous value.
    pub fn initialize(&self, info: &ElectionInfo) -> Result<(), ElectionError> {
        let deadline = self.deadline();
        deadline.check()?;
        let bytes = bincode::serialize(info)
            .map_err(|e| ElectionError::Corrupted(format!("encode election info: {e}")))?;
        let mut txn = self.store.write_txn()?;
        txn.put_meta(ELECTION_INFO_KEY, &bytes)?;
        deadline.check()?;
        txn.commit()?;
        info!(name = %info.name, owner = ?info.owner.as_ref().map(VoterAddress::as_str), "election initialized");
        Ok(())
    }

    pub fn info(&self) -> Result<Option<ElectionInfo>, ElectionError> {
        self.deadline().check()?;
        let txn = self.store.read_txn()?;
        txn.get_meta(ELECTION_INFO_KEY)?
            .map(|bytes| {
                bincode::deserialize(&bytes)
                    .map_err(|e| ElectionError::Corrupted(format!("decode election info: {e}")))
            })
            .transpose()
    }

    pub fn add_candidate(&self, name: &str) -> Result<CandidateId, ElectionError> {
        self.ledger.add(name, &self.deadline())
    }

    pub fn register_voter(&self, address: &str) -> Result<(), ElectionError> {
        let address = VoterAddress::parse(address)?;
        self.registry.register(&address, &self.deadline())
    }

    pub fn authorize_voter(&self, address: &str) -> Result<(), ElectionError> {
        let address = VoterAddress::parse(address)?;
        self.registry.authorize(&address, &self.deadline())
    }

    pub fn cast_vote(&self, address: &str, candidate: CandidateId) -> Result<(), ElectionError> {
        self.cast_vote_with_deadline(address, candidate, &self.deadline())
    }

    /// Like [`Election::cast_vote`] but under the caller's own deadline.
    pub fn cast_vote_with_deadline(
        &self,
        address: &str,
        candidate: CandidateId,
        deadline: &Deadline,
    ) -> Result<(), ElectionError> {
        let address = VoterAddress::parse(address)?;
        self.engine.cast_vote(&address, candidate, deadline)
    }

    pub fn voter_status(&self, address: &str) -> Result<VoterStatus, ElectionError> {
        let address = VoterAddress::parse(address)?;
        self.registry.status(&address, &self.deadline())
    }

    pub fn voter(&self, address: &str) -> Result<Voter, ElectionError> {
        let address = VoterAddress::parse(address)?;
        self.registry.voter(&address, &self.deadline())
    }

    pub fn list_candidates(&self) -> Result<Vec<Candidate>, ElectionError> {
        self.ledger.list_all(&self.deadline())
    }

    pub fn tally(&self) -> Result<Vec<TallyEntry>, ElectionError> {
        self.reporter.tally(&self.deadline())
    }

    pub fn summary(&self) -> Result<ElectionSummary, ElectionError> {
        self.reporter.summary(&self.deadline())
    }

    pub fn audit(&self) -> Result<AuditReport, ElectionError> {
        self.reporter.audit(&self.deadline())
    }

    /// The tally rendered one line per candidate, headed by the election
    /// name when one is stored.
    pub fn results_text(&self) -> Result<String, ElectionError> {
        let info = self.info()?;
        let tally = self.tally()?;
        Ok(render_results(&tally, info.as_ref().map(|i| i.name.as_str())))
    }

    pub fn stats(&self) -> CastStats {
        self.engine.stats()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &VoterRegistry<S> {
        &self.registry
    }

    pub fn ledger(&self) -> &CandidateLedger<S> {
        &self.ledger
    }

    pub fn engine(&self) -> &VotingEngine<S> {
        &self.engine
    }

    pub fn reporter(&self) -> &ResultReporter<S> {
        &self.reporter
    }
}
