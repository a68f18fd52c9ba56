//! Transaction handles and the store entry point.

use crate::{
    CandidateReader, CandidateWriter, MetaReader, MetaWriter, StoreError, VoterReader,
    VoterWriter,
};

/// A consistent read-only view of the store.
pub trait ReadTxn: VoterReader + CandidateReader + MetaReader {}

impl<T: VoterReader + CandidateReader + MetaReader> ReadTxn for T {}

/// A writable unit of work.
///
/// Reads through a write transaction observe its own uncommitted writes.
/// Dropping the handle without calling [`WriteTxn::commit`] discards every
/// write made through it.
pub trait WriteTxn: ReadTxn + VoterWriter + CandidateWriter + MetaWriter {
    /// Atomically publish all writes.
    ///
    /// Fails with [`StoreError::Conflict`] if the backend detected that a
    /// concurrent transaction invalidated something this one read.
    fn commit(self) -> Result<(), StoreError>;

    /// Discard all writes. Equivalent to dropping the handle.
    fn rollback(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// A transactional store for voters and candidates.
///
/// Implementations must guarantee that the writes of a committed
/// [`WriteTxn`] become visible together, and that two write transactions
/// whose reads and writes overlap cannot both commit.
pub trait VotingStore: Send + Sync {
    type Read<'a>: ReadTxn
    where
        Self: 'a;
    type Write<'a>: WriteTxn
    where
        Self: 'a;

    /// Open a read-only snapshot.
    fn read_txn(&self) -> Result<Self::Read<'_>, StoreError>;

    /// Begin a write transaction.
    fn write_txn(&self) -> Result<Self::Write<'_>, StoreError>;
}
