//! Nullable store: thread-safe in-memory storage for testing.
//!
//! Transactions are optimistic. A write transaction works on a private copy
//! of the tables taken at begin, remembers the version of everything it
//! read, and at commit time fails with [`StoreError::Conflict`] if any of
//! those versions moved. This makes check-then-act races observable in tests
//! instead of being hidden behind a global lock.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use ballot_store::{
    CandidateReader, CandidateWriter, MetaReader, MetaWriter, StoreError, VoterReader,
    VoterWriter, VotingStore, WriteTxn,
};
use ballot_types::{Candidate, CandidateId, Voter, VoterAddress};

const NEXT_CANDIDATE_ID_KEY: &str = "next_candidate_id";

type WriteHook = Box<dyn FnOnce() + Send>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Key {
    Voter(VoterAddress),
    Candidate(CandidateId),
    Meta(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Table {
    Voters,
    Candidates,
    Meta,
}

impl Key {
    fn table(&self) -> Table {
        match self {
            Key::Voter(_) => Table::Voters,
            Key::Candidate(_) => Table::Candidates,
            Key::Meta(_) => Table::Meta,
        }
    }
}

/// What a transaction looked at: one key, or a whole table (scans, counts).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ReadMark {
    Key(Key),
    Table(Table),
}

#[derive(Clone, Default)]
struct Tables {
    voters: BTreeMap<VoterAddress, Voter>,
    candidates: BTreeMap<CandidateId, Candidate>,
    meta: BTreeMap<String, Vec<u8>>,
    versions: HashMap<Key, u64>,
    table_versions: HashMap<Table, u64>,
}

impl Tables {
    fn version_of(&self, mark: &ReadMark) -> u64 {
        match mark {
            ReadMark::Key(key) => self.versions.get(key).copied().unwrap_or(0),
            ReadMark::Table(table) => self.table_versions.get(table).copied().unwrap_or(0),
        }
    }

    /// Copy `key` from `source` into `self` (or remove it) and bump versions.
    fn publish(&mut self, key: &Key, source: &Tables) {
        match key {
            Key::Voter(address) => match source.voters.get(address) {
                Some(v) => {
                    self.voters.insert(address.clone(), v.clone());
                }
                None => {
                    self.voters.remove(address);
                }
            },
            Key::Candidate(id) => match source.candidates.get(id) {
                Some(c) => {
                    self.candidates.insert(*id, c.clone());
                }
                None => {
                    self.candidates.remove(id);
                }
            },
            Key::Meta(name) => match source.meta.get(name) {
                Some(m) => {
                    self.meta.insert(name.clone(), m.clone());
                }
                None => {
                    self.meta.remove(name);
                }
            },
        }
        *self.versions.entry(key.clone()).or_insert(0) += 1;
        *self.table_versions.entry(key.table()).or_insert(0) += 1;
    }
}

/// An in-memory voter + candidate store for testing.
/// Thread-safe; many threads may run transactions against it at once.
pub struct NullStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    failing_commits: AtomicUsize,
    write_hook: Mutex<Option<WriteHook>>,
    commits: AtomicU64,
    conflicts: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            unavailable: AtomicBool::new(false),
            failing_commits: AtomicUsize::new(0),
            write_hook: Mutex::new(None),
            commits: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
        }
    }

    /// While set, opening any transaction fails with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `n` commits fail with `StoreError::Unavailable`,
    /// discarding their writes.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Run `hook` once, right after the next write staged by any write
    /// transaction. The hook runs outside every internal lock, so it may
    /// itself use the store.
    pub fn on_next_write(&self, hook: impl FnOnce() + Send + 'static) {
        *self.write_hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Number of write transactions that committed.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of commits rejected because of a concurrent writer.
    pub fn conflict_count(&self) -> u64 {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store switched off".into()));
        }
        Ok(())
    }

    fn take_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn fire_write_hook(&self) {
        let hook = self.write_hook.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn snapshot(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VotingStore for NullStore {
    type Read<'a> = NullReadTxn;
    type Write<'a> = NullWriteTxn<'a>;

    fn read_txn(&self) -> Result<NullReadTxn, StoreError> {
        self.check_available()?;
        Ok(NullReadTxn {
            tables: self.snapshot(),
        })
    }

    fn write_txn(&self) -> Result<NullWriteTxn<'_>, StoreError> {
        self.check_available()?;
        Ok(NullWriteTxn {
            store: self,
            tables: self.snapshot(),
            reads: RefCell::new(HashMap::new()),
            writes: HashSet::new(),
        })
    }
}

/// Read-only snapshot taken when the transaction began.
pub struct NullReadTxn {
    tables: Tables,
}

impl VoterReader for NullReadTxn {
    fn get_voter(&self, address: &VoterAddress) -> Result<Option<Voter>, StoreError> {
        Ok(self.tables.voters.get(address).cloned())
    }

    fn voter_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.voters.len() as u64)
    }

    fn iter_voters(&self) -> Result<Vec<Voter>, StoreError> {
        Ok(self.tables.voters.values().cloned().collect())
    }
}

impl CandidateReader for NullReadTxn {
    fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        Ok(self.tables.candidates.get(&id).cloned())
    }

    fn iter_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.tables.candidates.values().cloned().collect())
    }
}

impl MetaReader for NullReadTxn {
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.meta.get(key).cloned())
    }
}

/// Optimistic write transaction.
pub struct NullWriteTxn<'s> {
    store: &'s NullStore,
    /// Private copy of the tables with this transaction's writes applied.
    tables: Tables,
    reads: RefCell<HashMap<ReadMark, u64>>,
    writes: HashSet<Key>,
}

impl NullWriteTxn<'_> {
    fn mark_read(&self, mark: ReadMark) {
        let version = self.tables.version_of(&mark);
        self.reads.borrow_mut().entry(mark).or_insert(version);
    }

    fn mark_written(&mut self, key: Key) {
        self.writes.insert(key);
        self.store.fire_write_hook();
    }
}

impl VoterReader for NullWriteTxn<'_> {
    fn get_voter(&self, address: &VoterAddress) -> Result<Option<Voter>, StoreError> {
        self.mark_read(ReadMark::Key(Key::Voter(address.clone())));
        Ok(self.tables.voters.get(address).cloned())
    }

    fn voter_count(&self) -> Result<u64, StoreError> {
        self.mark_read(ReadMark::Table(Table::Voters));
        Ok(self.tables.voters.len() as u64)
    }

    fn iter_voters(&self) -> Result<Vec<Voter>, StoreError> {
        self.mark_read(ReadMark::Table(Table::Voters));
        Ok(self.tables.voters.values().cloned().collect())
    }
}

impl CandidateReader for NullWriteTxn<'_> {
    fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        self.mark_read(ReadMark::Key(Key::Candidate(id)));
        Ok(self.tables.candidates.get(&id).cloned())
    }

    fn iter_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        self.mark_read(ReadMark::Table(Table::Candidates));
        Ok(self.tables.candidates.values().cloned().collect())
    }
}

impl MetaReader for NullWriteTxn<'_> {
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.mark_read(ReadMark::Key(Key::Meta(key.to_string())));
        Ok(self.tables.meta.get(key).cloned())
    }
}

impl VoterWriter for NullWriteTxn<'_> {
    fn put_voter(&mut self, voter: &Voter) -> Result<(), StoreError> {
        self.tables
            .voters
            .insert(voter.address.clone(), voter.clone());
        self.mark_written(Key::Voter(voter.address.clone()));
        Ok(())
    }
}

impl CandidateWriter for NullWriteTxn<'_> {
    fn allocate_candidate_id(&mut self) -> Result<CandidateId, StoreError> {
        let next = match self.get_meta(NEXT_CANDIDATE_ID_KEY)? {
            Some(bytes) => CandidateId::from_key(&bytes).ok_or_else(|| {
                StoreError::Corruption("next_candidate_id has unexpected byte length".into())
            })?,
            None => CandidateId::FIRST,
        };
        self.put_meta(NEXT_CANDIDATE_ID_KEY, &next.next().to_key())?;
        Ok(next)
    }

    fn put_candidate(&mut self, candidate: &Candidate) -> Result<(), StoreError> {
        self.tables
            .candidates
            .insert(candidate.id, candidate.clone());
        self.mark_written(Key::Candidate(candidate.id));
        Ok(())
    }
}

impl MetaWriter for NullWriteTxn<'_> {
    fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.tables.meta.insert(key.to_string(), value.to_vec());
        self.mark_written(Key::Meta(key.to_string()));
        Ok(())
    }

    fn delete_meta(&mut self, key: &str) -> Result<(), StoreError> {
        self.tables.meta.remove(key);
        self.mark_written(Key::Meta(key.to_string()));
        Ok(())
    }
}

impl WriteTxn for NullWriteTxn<'_> {
    fn commit(self) -> Result<(), StoreError> {
        if self.store.take_commit_failure() {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        let mut shared = self.store.tables.lock().unwrap();
        for (mark, seen) in self.reads.borrow().iter() {
            if shared.version_of(mark) != *seen {
                self.store.conflicts.fetch_add(1, Ordering::SeqCst);
                return Err(StoreError::Conflict(format!(
                    "{:?} changed since it was read",
                    mark
                )));
            }
        }
        for key in &self.writes {
            shared.publish(key, &self.tables);
        }
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::Timestamp;
    use std::sync::Arc;

    fn test_address(raw: &str) -> VoterAddress {
        VoterAddress::parse(raw).unwrap()
    }

    #[test]
    fn test_put_get_voter() {
        let store = NullStore::new();
        let voter = Voter::registered(test_address("0xA"), Timestamp::new(1));
        let mut txn = store.write_txn().unwrap();
        txn.put_voter(&voter).unwrap();
        txn.commit().unwrap();

        let rtxn = store.read_txn().unwrap();
        assert_eq!(rtxn.get_voter(&voter.address).unwrap(), Some(voter));
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_uncommitted_writes_invisible() {
        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        txn.put_voter(&Voter::registered(test_address("0xA"), Timestamp::new(1)))
            .unwrap();
        assert!(store
            .read_txn()
            .unwrap()
            .get_voter(&test_address("0xA"))
            .unwrap()
            .is_none());
        txn.rollback();
        assert_eq!(store.read_txn().unwrap().voter_count().unwrap(), 0);
    }

    #[test]
    fn test_conflicting_commit_rejected() {
        let store = NullStore::new();
        let addr = test_address("0xA");
        let mut seed = store.write_txn().unwrap();
        seed.put_voter(&Voter::registered(addr.clone(), Timestamp::new(1)))
            .unwrap();
        seed.commit().unwrap();

        let mut first = store.write_txn().unwrap();
        let mut second = store.write_txn().unwrap();
        let mut a = first.get_voter(&addr).unwrap().unwrap();
        let mut b = second.get_voter(&addr).unwrap().unwrap();
        a.authorized = true;
        b.voted = true;
        first.put_voter(&a).unwrap();
        second.put_voter(&b).unwrap();

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(StoreError::Conflict(_))));
        assert_eq!(store.conflict_count(), 1);

        let stored = store.read_txn().unwrap().get_voter(&addr).unwrap().unwrap();
        assert!(stored.authorized);
        assert!(!stored.voted);
    }

    #[test]
    fn test_candidate_id_allocation_conflicts() {
        let store = NullStore::new();
        let mut first = store.write_txn().unwrap();
        let mut second = store.write_txn().unwrap();
        assert_eq!(first.allocate_candidate_id().unwrap(), CandidateId::FIRST);
        assert_eq!(second.allocate_candidate_id().unwrap(), CandidateId::FIRST);
        first.commit().unwrap();
        assert!(second.commit().is_err());

        let mut third = store.write_txn().unwrap();
        assert_eq!(third.allocate_candidate_id().unwrap(), CandidateId::new(2));
    }

    #[test]
    fn test_injected_failures() {
        let store = NullStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.read_txn(), Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);

        store.fail_next_commits(1);
        let mut txn = store.write_txn().unwrap();
        txn.put_meta("k", b"v").unwrap();
        assert!(matches!(txn.commit(), Err(StoreError::Unavailable(_))));
        assert_eq!(store.read_txn().unwrap().get_meta("k").unwrap(), None);

        let mut txn = store.write_txn().unwrap();
        txn.put_meta("k", b"v").unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_write_hook_fires_once() {
        let store = NullStore::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        store.on_next_write(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut txn = store.write_txn().unwrap();
        txn.put_meta("a", b"1").unwrap();
        txn.put_meta("b", b"2").unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
