//! The election running on LMDB: state survives reopening the environment.

use std::sync::Arc;

use ballot_election::{Election, ElectionError, ElectionInfo, ErrorKind, TallyEntry};
use ballot_store_lmdb::{check_integrity, LmdbEnvironment};
use ballot_types::CandidateId;

const MAP_SIZE: usize = 64 * 1024 * 1024;

fn open(dir: &tempfile::TempDir) -> Election<LmdbEnvironment> {
    let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).expect("open env");
    Election::new(Arc::new(env))
}

#[test]
fn scenario_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let election = open(&dir);
        election
            .initialize(&ElectionInfo::new("Board", Some("0xOwner")).unwrap())
            .unwrap();
        election.register_voter("0xA").unwrap();
        election.authorize_voter("0xA").unwrap();
        let alice = election.add_candidate("Alice").unwrap();
        election.add_candidate("Bob").unwrap();
        election.cast_vote("0xA", alice).unwrap();
    }

    let election = open(&dir);
    assert_eq!(election.info().unwrap().unwrap().name, "Board");
    assert_eq!(
        election.tally().unwrap(),
        vec![
            TallyEntry { name: "Alice".into(), vote_count: 1 },
            TallyEntry { name: "Bob".into(), vote_count: 0 },
        ]
    );
    assert_eq!(election.results_text().unwrap(), "Board\nAlice: 1 votes\nBob: 0 votes\n");

    // The single vote is still spent after reopening.
    assert!(matches!(
        election.cast_vote("0xA", CandidateId::new(2)),
        Err(ElectionError::AlreadyVoted(_))
    ));

    // Ids keep counting from where they left off.
    assert_eq!(election.add_candidate("Carol").unwrap(), CandidateId::new(3));
    assert!(election.audit().unwrap().is_clean());
}

#[test]
fn failed_cast_leaves_nothing_on_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let election = open(&dir);
        election.register_voter("0xA").unwrap();
        election.authorize_voter("0xA").unwrap();
        election.add_candidate("Alice").unwrap();
        assert!(matches!(
            election.cast_vote("0xA", CandidateId::new(5)),
            Err(ElectionError::CandidateNotFound(_))
        ));
    }

    let election = open(&dir);
    assert!(!election.voter_status("0xA").unwrap().voted);
    assert_eq!(election.tally().unwrap()[0].vote_count, 0);
}

#[test]
fn integrity_check_counts_records() {
    let dir = tempfile::tempdir().expect("temp dir");
    let election = open(&dir);
    election.register_voter("0xA").unwrap();
    election.add_candidate("Alice").unwrap();

    let report = check_integrity(&election.store().raw_env()).unwrap();
    assert!(report.is_healthy(), "{:?}", report.errors);
    assert_eq!(report.databases_checked, 3);
    // One voter, one candidate, plus the schema version and id counter.
    assert_eq!(report.total_entries, 4);
}

#[test]
fn full_map_is_a_permanent_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 256 * 1024).expect("open tiny env");
    let election = Election::new(Arc::new(env));

    let err = (0..100_000)
        .find_map(|i| election.register_voter(&format!("0x{i:0>200}")).err())
        .expect("a 256 KiB map fills up");

    assert!(matches!(err, ElectionError::StorageFailure(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.is_retryable());
}
