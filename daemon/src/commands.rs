//! Subcommands and their output.

use anyhow::Context;
use ballot_election::{Election, ElectionError, ElectionInfo, ErrorKind};
use ballot_store_lmdb::{check_integrity, LmdbEnvironment};
use ballot_types::CandidateId;
use clap::Subcommand;
use serde_json::json;

use crate::config::ElectionConfig;

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Store the election name and owner.
    Init {
        /// Overrides `election_name` from the config.
        #[arg(long)]
        name: Option<String>,
        /// Overrides `owner` from the config.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Add a candidate and print its id.
    AddCandidate { name: String },
    /// Register an address, or reset an existing one.
    Register { address: String },
    /// Allow a registered address to vote.
    Authorize { address: String },
    /// Cast an address's single vote.
    Vote {
        address: String,
        candidate: CandidateId,
    },
    /// Show whether an address is authorized and has voted.
    Status { address: String },
    /// List candidates with their ids and counts.
    Candidates,
    /// Vote counts by candidate.
    Tally,
    /// Rendered results with a summary.
    Results,
    /// Verify the data directory and recount every vote.
    Check,
}

/// What a command prints: plain text, or JSON with `--json`.
#[derive(Debug)]
pub struct Output {
    pub text: String,
    pub json: serde_json::Value,
}

impl Output {
    fn new(text: impl Into<String>, json: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            json,
        }
    }

    pub fn render(&self, as_json: bool) -> String {
        if as_json {
            self.json.to_string()
        } else {
            self.text.trim_end().to_string()
        }
    }
}

/// Run one command to completion. Blocks on store I/O.
pub fn execute(
    election: &Election<LmdbEnvironment>,
    config: &ElectionConfig,
    command: &Command,
) -> anyhow::Result<Output> {
    let output = match command {
        Command::Init { name, owner } => {
            let name = name.as_deref().unwrap_or(&config.election_name);
            let owner = owner.as_deref().or(config.owner.as_deref());
            let info = ElectionInfo::new(name, owner)?;
            election.initialize(&info)?;
            Output::new(format!("initialized election '{}'", info.name), json!(info))
        }
        Command::AddCandidate { name } => {
            let id = election.add_candidate(name)?;
            Output::new(format!("added candidate {id}"), json!({ "id": id }))
        }
        Command::Register { address } => {
            election.register_voter(address)?;
            Output::new(format!("registered {address}"), json!({ "registered": address }))
        }
        Command::Authorize { address } => {
            election.authorize_voter(address)?;
            Output::new(format!("authorized {address}"), json!({ "authorized": address }))
        }
        Command::Vote { address, candidate } => {
            election.cast_vote(address, *candidate)?;
            Output::new(
                format!("{address} voted for candidate {candidate}"),
                json!({ "voter": address, "candidate": candidate }),
            )
        }
        Command::Status { address } => {
            let voter = election.voter(address)?;
            let vote = voter.vote.map_or_else(|| "-1".to_string(), |id| id.to_string());
            Output::new(
                format!(
                    "{}: authorized={} voted={} vote={}",
                    voter.address, voter.authorized, voter.voted, vote
                ),
                json!(voter),
            )
        }
        Command::Candidates => {
            let candidates = election.list_candidates()?;
            let text: String = candidates
                .iter()
                .map(|c| format!("{}\t{}\t{}\n", c.id, c.name, c.vote_count))
                .collect();
            Output::new(text, json!(candidates))
        }
        Command::Tally => {
            let tally = election.tally()?;
            Output::new(ballot_election::render_results(&tally, None), json!(tally))
        }
        Command::Results => {
            let text = election.results_text()?;
            let summary = election.summary()?;
            Output::new(
                format!(
                    "{text}\n{} votes from {} registered voters ({} authorized)",
                    summary.total_votes, summary.registered_voters, summary.authorized_voters
                ),
                json!({ "info": election.info()?, "tally": election.tally()?, "summary": summary }),
            )
        }
        Command::Check => {
            let integrity = check_integrity(&election.store().raw_env())
                .context("reading LMDB databases")?;
            let audit = election.audit()?;
            let healthy = integrity.is_healthy() && audit.is_clean();
            let mut text = format!(
                "{} databases, {} entries, {} audit mismatches, {} dangling votes",
                integrity.databases_checked,
                integrity.total_entries,
                audit.mismatches.len(),
                audit.dangling_votes.len()
            );
            for e in &integrity.errors {
                text.push_str(&format!("\n  {e}"));
            }
            for m in &audit.mismatches {
                text.push_str(&format!(
                    "\n  candidate {} ({}): recorded {}, counted {}",
                    m.candidate, m.name, m.recorded, m.counted
                ));
            }
            if !healthy {
                anyhow::bail!("{text}");
            }
            Output::new(
                text,
                json!({
                    "databases_checked": integrity.databases_checked,
                    "total_entries": integrity.total_entries,
                    "audit": audit,
                }),
            )
        }
    };
    Ok(output)
}

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_NOT_PERMITTED: u8 = 2;
pub const EXIT_RETRY: u8 = 75;
pub const EXIT_CANCELLED: u8 = 130;

/// Exit status for a failed command: distinguishes "try again" from
/// "not permitted".
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ElectionError>().map(ElectionError::kind) {
        Some(ErrorKind::Conflict | ErrorKind::Unavailable) => EXIT_RETRY,
        Some(ErrorKind::NotFound | ErrorKind::InvalidArgument | ErrorKind::PreconditionFailed) => {
            EXIT_NOT_PERMITTED
        }
        Some(ErrorKind::Cancelled) => EXIT_CANCELLED,
        Some(ErrorKind::Internal) | None => EXIT_FAILURE,
    }
}

/// One-line hint printed after the error itself.
pub fn hint(err: &anyhow::Error) -> Option<&'static str> {
    let err = err.downcast_ref::<ElectionError>()?;
    if err.is_retryable() {
        Some("try again")
    } else {
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::InvalidArgument | ErrorKind::PreconditionFailed => {
                Some("this action is not permitted")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn election() -> (tempfile::TempDir, Election<LmdbEnvironment>) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 1 << 24).unwrap();
        (dir, Election::new(Arc::new(env)))
    }

    fn run(election: &Election<LmdbEnvironment>, command: Command) -> anyhow::Result<Output> {
        execute(election, &ElectionConfig::default(), &command)
    }

    #[test]
    fn full_session() {
        let (_dir, election) = election();
        run(&election, Command::Init { name: Some("Board".into()), owner: None }).unwrap();
        let added = run(&election, Command::AddCandidate { name: "Alice".into() }).unwrap();
        assert_eq!(added.json, json!({ "id": 1 }));
        run(&election, Command::AddCandidate { name: "Bob".into() }).unwrap();
        run(&election, Command::Register { address: "0xA".into() }).unwrap();
        run(&election, Command::Authorize { address: "0xA".into() }).unwrap();
        run(&election, Command::Vote { address: "0xA".into(), candidate: CandidateId::new(1) }).unwrap();

        let status = run(&election, Command::Status { address: "0xA".into() }).unwrap();
        assert_eq!(status.render(false), "0xA: authorized=true voted=true vote=1");

        let tally = run(&election, Command::Tally).unwrap();
        assert_eq!(tally.render(false), "Alice: 1 votes\nBob: 0 votes");

        let results = run(&election, Command::Results).unwrap();
        assert!(results.render(false).starts_with("Board\nAlice: 1 votes\nBob: 0 votes\n"));
        assert_eq!(results.json["summary"]["total_votes"], 1);

        run(&election, Command::Check).unwrap();
    }

    #[test]
    fn status_of_fresh_voter_shows_no_vote() {
        let (_dir, election) = election();
        run(&election, Command::Register { address: "0xB".into() }).unwrap();
        let status = run(&election, Command::Status { address: "0xB".into() }).unwrap();
        assert_eq!(status.render(false), "0xB: authorized=false voted=false vote=-1");
    }

    #[test]
    fn failures_map_to_exit_codes() {
        let (_dir, election) = election();
        run(&election, Command::AddCandidate { name: "Alice".into() }).unwrap();
        run(&election, Command::Register { address: "0xB".into() }).unwrap();

        let err = run(&election, Command::Vote { address: "0xB".into(), candidate: CandidateId::new(1) }).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_NOT_PERMITTED);
        assert_eq!(hint(&err), Some("this action is not permitted"));

        let conflict = anyhow::Error::new(ElectionError::TransactionConflict("race".into()));
        assert_eq!(exit_code(&conflict), EXIT_RETRY);
        assert_eq!(hint(&conflict), Some("try again"));

        let full = anyhow::Error::new(ElectionError::StorageFailure("map full".into()));
        assert_eq!(exit_code(&full), EXIT_FAILURE);
        assert_eq!(hint(&full), None);

        let cancelled = anyhow::Error::new(ElectionError::Cancelled);
        assert_eq!(exit_code(&cancelled), EXIT_CANCELLED);
        assert_eq!(hint(&cancelled), None);
    }
}
