//! End-to-end election scenarios over the in-memory store:
//! registration → authorization → casting → tally, plus every failure path
//! a cast can take and what it leaves behind.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use ballot_election::{CancelToken, Deadline, Election, ElectionError, ErrorKind, TallyEntry};
use ballot_nullables::{NullClock, NullStore};
use ballot_types::CandidateId;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_election() -> Arc<Election<NullStore>> {
    ballot_utils::init_tracing();
    Arc::new(Election::with_clock(
        Arc::new(NullStore::new()),
        Arc::new(NullClock::new(1_700_000_000)),
    ))
}

fn entry(name: &str, vote_count: u64) -> TallyEntry {
    TallyEntry {
        name: name.to_string(),
        vote_count,
    }
}

fn eligible(election: &Election<NullStore>, address: &str) {
    election.register_voter(address).unwrap();
    election.authorize_voter(address).unwrap();
}

/// Alice and Bob, in that order.
fn two_candidates(election: &Election<NullStore>) -> (CandidateId, CandidateId) {
    (
        election.add_candidate("Alice").unwrap(),
        election.add_candidate("Bob").unwrap(),
    )
}

// ---------------------------------------------------------------------------
// 1. Happy path and single-vote rule
// ---------------------------------------------------------------------------

#[test]
fn alice_bob_scenario() {
    let election = new_election();
    eligible(&election, "0xA");
    let (alice, bob) = two_candidates(&election);
    assert_eq!(alice, CandidateId::new(1));
    assert_eq!(bob, CandidateId::new(2));

    election.cast_vote("0xA", alice).unwrap();
    let err = election.cast_vote("0xA", bob).unwrap_err();
    assert!(matches!(err, ElectionError::AlreadyVoted(_)));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 1), entry("Bob", 0)]);
    assert_eq!(
        election.results_text().unwrap(),
        "Alice: 1 votes\nBob: 0 votes\n"
    );
    assert!(election.audit().unwrap().is_clean());
}

#[test]
fn unregistered_voter_is_rejected() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);

    let err = election.cast_vote("0xUnregistered", alice).unwrap_err();
    assert!(matches!(err, ElectionError::VoterNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 0), entry("Bob", 0)]);
}

#[test]
fn unauthorized_voter_is_rejected() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);
    election.register_voter("0xB").unwrap();

    let err = election.cast_vote("0xB", alice).unwrap_err();
    assert!(matches!(err, ElectionError::NotAuthorized(_)));
    assert!(!election.voter_status("0xB").unwrap().voted);
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 0), entry("Bob", 0)]);
}

#[test]
fn reregistration_resets_voter() {
    let election = new_election();
    let (alice, bob) = two_candidates(&election);
    eligible(&election, "0xA");
    election.cast_vote("0xA", alice).unwrap();

    election.register_voter("0xA").unwrap();
    let voter = election.voter("0xA").unwrap();
    assert!(!voter.authorized);
    assert!(!voter.voted);
    assert_eq!(voter.vote, None);

    let err = election.cast_vote("0xA", bob).unwrap_err();
    assert!(matches!(err, ElectionError::NotAuthorized(_)));

    // Counts never go down, and the retired vote keeps the audit balanced.
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 1), entry("Bob", 0)]);
    assert!(election.audit().unwrap().is_clean());

    // A new epoch may vote again.
    election.authorize_voter("0xA").unwrap();
    election.cast_vote("0xA", bob).unwrap();
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 1), entry("Bob", 1)]);
    assert!(election.audit().unwrap().is_clean());
}

#[test]
fn authorizing_unknown_address_fails_and_creates_nothing() {
    let election = new_election();
    let err = election.authorize_voter("0xGhost").unwrap_err();
    assert!(matches!(err, ElectionError::VoterNotFound(_)));
    assert!(matches!(
        election.voter_status("0xGhost"),
        Err(ElectionError::VoterNotFound(_))
    ));
    assert_eq!(election.summary().unwrap().registered_voters, 0);
}

#[test]
fn summary_reflects_scenario() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);
    eligible(&election, "0xA");
    eligible(&election, "0xB");
    election.register_voter("0xC").unwrap();
    election.cast_vote("0xA", alice).unwrap();

    let summary = election.summary().unwrap();
    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.total_votes, 1);
    assert_eq!(summary.registered_voters, 3);
    assert_eq!(summary.authorized_voters, 2);
    assert_eq!(summary.voters_voted, 1);
}

// ---------------------------------------------------------------------------
// 2. Atomicity on failure paths
// ---------------------------------------------------------------------------

#[test]
fn unknown_candidate_leaves_voter_eligible() {
    let election = new_election();
    two_candidates(&election);
    eligible(&election, "0xA");

    let err = election.cast_vote("0xA", CandidateId::new(99)).unwrap_err();
    assert!(matches!(err, ElectionError::CandidateNotFound(_)));

    let voter = election.voter("0xA").unwrap();
    assert!(voter.authorized);
    assert!(!voter.voted);
    assert_eq!(voter.vote, None);
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 0), entry("Bob", 0)]);
}

#[test]
fn injected_commit_failure_changes_nothing() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);
    eligible(&election, "0xA");

    election.store().fail_next_commits(1);
    let err = election.cast_vote("0xA", alice).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());
    assert!(!election.voter_status("0xA").unwrap().voted);
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 0), entry("Bob", 0)]);

    election.cast_vote("0xA", alice).unwrap();
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 1), entry("Bob", 0)]);
}

#[test]
fn unavailable_store_is_retryable() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);
    eligible(&election, "0xA");

    election.store().set_unavailable(true);
    let err = election.cast_vote("0xA", alice).unwrap_err();
    assert!(matches!(err, ElectionError::StoreUnavailable(_)));
    assert!(err.is_retryable());
    assert!(election.tally().unwrap_err().is_retryable());

    election.store().set_unavailable(false);
    election.cast_vote("0xA", alice).unwrap();
}

#[test]
fn expired_deadline_rejects_before_any_write() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);
    eligible(&election, "0xA");
    let commits = election.store().commit_count();

    let err = election
        .cast_vote_with_deadline("0xA", alice, &Deadline::at(Instant::now()))
        .unwrap_err();
    assert!(matches!(err, ElectionError::DeadlineExceeded));
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!err.is_retryable());
    assert_eq!(election.store().commit_count(), commits);
}

#[test]
fn cancellation_mid_transaction_rolls_back() {
    let election = new_election();
    let (alice, _) = two_candidates(&election);
    eligible(&election, "0xA");

    let token = CancelToken::new();
    let trip = token.clone();
    // Fires after the candidate increment is staged, before the voter is marked.
    election.store().on_next_write(move || trip.cancel());

    let deadline = Deadline::none().with_token(token);
    let err = election.cast_vote_with_deadline("0xA", alice, &deadline).unwrap_err();
    assert!(matches!(err, ElectionError::Cancelled));

    assert!(!election.voter_status("0xA").unwrap().voted);
    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 0), entry("Bob", 0)]);
    assert_eq!(election.stats().cancelled, 1);
}

// ---------------------------------------------------------------------------
// 3. Check-then-act race, made deterministic
// ---------------------------------------------------------------------------

#[test]
fn interleaved_cast_loses_with_conflict() {
    let election = new_election();
    let (alice, bob) = two_candidates(&election);
    eligible(&election, "0xC");

    // While the outer cast holds an open write transaction, a second cast
    // for the same voter runs to completion.
    let inner_result = Arc::new(Mutex::new(None));
    {
        let election = Arc::clone(&election);
        let slot = Arc::clone(&inner_result);
        let store = Arc::clone(election.store());
        store.on_next_write(move || {
            let result = election.cast_vote("0xC", bob);
            *slot.lock().unwrap() = Some(result);
        });
    }

    let outer = election.cast_vote("0xC", alice);
    let inner = inner_result.lock().unwrap().take().expect("hook ran");

    assert!(inner.is_ok());
    let err = outer.unwrap_err();
    assert!(matches!(err, ElectionError::TransactionConflict(_)));
    assert!(err.is_retryable());
    assert_eq!(election.store().conflict_count(), 1);

    // Retrying the loser from the top now sees the committed vote.
    assert!(matches!(
        election.cast_vote("0xC", alice),
        Err(ElectionError::AlreadyVoted(_))
    ));

    assert_eq!(election.tally().unwrap(), vec![entry("Alice", 0), entry("Bob", 1)]);
    assert_eq!(election.voter("0xC").unwrap().vote, Some(bob));
    assert!(election.audit().unwrap().is_clean());
}
