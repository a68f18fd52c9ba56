//! LMDB storage backend for the ballot system.
//!
//! Implements the traits from `ballot-store` using the `heed` LMDB bindings.
//! Voters, candidates and metadata live in three databases of one
//! environment, so a single LMDB write transaction covers all of them.
//! LMDB admits one writer at a time, which makes every write transaction
//! serializable.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod migration;
pub mod txn;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use txn::{LmdbReadTxn, LmdbWriteTxn};
