//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use ballot_store::{StoreError, VotingStore};

use crate::migration::Migrator;
use crate::txn::{LmdbReadTxn, LmdbWriteTxn};
use crate::LmdbError;

/// Number of named databases the environment may hold.
const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    pub(crate) voters_db: Database<Bytes, Bytes>,
    pub(crate) candidates_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, opens the `voters`, `candidates` and
    /// `meta` databases, and brings the schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: each data directory is opened once per process; callers
        // share the returned environment instead of reopening the path.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let voters_db = env.create_database(&mut wtxn, Some("voters"))?;
        let candidates_db = env.create_database(&mut wtxn, Some("candidates"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            voters_db,
            candidates_db,
            meta_db,
        };

        let mut txn = environment.write_txn()?;
        Migrator::run(&mut txn)?;
        ballot_store::WriteTxn::commit(txn)?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    /// Shared handle to the raw environment, for integrity checks.
    pub fn raw_env(&self) -> Arc<Env> {
        Arc::clone(&self.env)
    }
}

impl VotingStore for LmdbEnvironment {
    type Read<'a> = LmdbReadTxn<'a>;
    type Write<'a> = LmdbWriteTxn<'a>;

    fn read_txn(&self) -> Result<LmdbReadTxn<'_>, StoreError> {
        LmdbReadTxn::new(self).map_err(StoreError::from)
    }

    fn write_txn(&self) -> Result<LmdbWriteTxn<'_>, StoreError> {
        LmdbWriteTxn::new(self).map_err(StoreError::from)
    }
}
