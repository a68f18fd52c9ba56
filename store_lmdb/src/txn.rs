//! LMDB read and write transactions.
//!
//! A [`LmdbWriteTxn`] wraps one `heed::RwTxn` spanning the voter, candidate
//! and meta databases. If it is dropped without [`WriteTxn::commit`], the
//! underlying LMDB transaction is aborted and nothing it wrote is kept.

use heed::{RoTxn, RwTxn};

use ballot_store::{
    CandidateReader, CandidateWriter, MetaReader, MetaWriter, StoreError, VoterReader,
    VoterWriter, WriteTxn,
};
use ballot_types::{Candidate, CandidateId, Voter, VoterAddress};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

/// Meta key holding the next candidate id to hand out (big-endian `u64`).
const NEXT_CANDIDATE_ID_KEY: &str = "next_candidate_id";

/// Read-only snapshot over all ballot databases.
pub struct LmdbReadTxn<'e> {
    env: &'e LmdbEnvironment,
    txn: RoTxn<'e>,
}

impl<'e> LmdbReadTxn<'e> {
    pub(crate) fn new(env: &'e LmdbEnvironment) -> Result<Self, LmdbError> {
        let txn = env.env().read_txn()?;
        Ok(Self { env, txn })
    }
}

/// Write transaction over all ballot databases.
pub struct LmdbWriteTxn<'e> {
    env: &'e LmdbEnvironment,
    txn: RwTxn<'e>,
}

impl<'e> LmdbWriteTxn<'e> {
    pub(crate) fn new(env: &'e LmdbEnvironment) -> Result<Self, LmdbError> {
        let txn = env.env().write_txn()?;
        Ok(Self { env, txn })
    }
}

// ── Shared readers ──────────────────────────────────────────────────────

fn read_voter(
    env: &LmdbEnvironment,
    txn: &RoTxn<'_>,
    address: &VoterAddress,
) -> Result<Option<Voter>, LmdbError> {
    match env.voters_db.get(txn, address.as_bytes())? {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
        None => Ok(None),
    }
}

fn read_voters(env: &LmdbEnvironment, txn: &RoTxn<'_>) -> Result<Vec<Voter>, LmdbError> {
    let mut voters = Vec::new();
    for entry in env.voters_db.iter(txn)? {
        let (_key, bytes) = entry?;
        voters.push(bincode::deserialize(bytes)?);
    }
    Ok(voters)
}

fn read_candidate(
    env: &LmdbEnvironment,
    txn: &RoTxn<'_>,
    id: CandidateId,
) -> Result<Option<Candidate>, LmdbError> {
    match env.candidates_db.get(txn, &id.to_key())? {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
        None => Ok(None),
    }
}

/// Candidates keyed by big-endian id, so LMDB's key order is id order.
fn read_candidates(env: &LmdbEnvironment, txn: &RoTxn<'_>) -> Result<Vec<Candidate>, LmdbError> {
    let mut candidates = Vec::new();
    for entry in env.candidates_db.iter(txn)? {
        let (_key, bytes) = entry?;
        candidates.push(bincode::deserialize(bytes)?);
    }
    Ok(candidates)
}

fn read_meta(
    env: &LmdbEnvironment,
    txn: &RoTxn<'_>,
    key: &str,
) -> Result<Option<Vec<u8>>, LmdbError> {
    Ok(env.meta_db.get(txn, key.as_bytes())?.map(|b| b.to_vec()))
}

macro_rules! impl_readers {
    ($txn:ident) => {
        impl VoterReader for $txn<'_> {
            fn get_voter(&self, address: &VoterAddress) -> Result<Option<Voter>, StoreError> {
                Ok(read_voter(self.env, &self.txn, address)?)
            }

            fn voter_count(&self) -> Result<u64, StoreError> {
                Ok(self
                    .env
                    .voters_db
                    .len(&self.txn)
                    .map_err(LmdbError::from)?)
            }

            fn iter_voters(&self) -> Result<Vec<Voter>, StoreError> {
                Ok(read_voters(self.env, &self.txn)?)
            }
        }

        impl CandidateReader for $txn<'_> {
            fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
                Ok(read_candidate(self.env, &self.txn, id)?)
            }

            fn iter_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
                Ok(read_candidates(self.env, &self.txn)?)
            }

            fn candidate_count(&self) -> Result<u64, StoreError> {
                Ok(self
                    .env
                    .candidates_db
                    .len(&self.txn)
                    .map_err(LmdbError::from)?)
            }
        }

        impl MetaReader for $txn<'_> {
            fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
                Ok(read_meta(self.env, &self.txn, key)?)
            }
        }
    };
}

impl_readers!(LmdbReadTxn);
impl_readers!(LmdbWriteTxn);

// ── Writers ─────────────────────────────────────────────────────────────

impl VoterWriter for LmdbWriteTxn<'_> {
    fn put_voter(&mut self, voter: &Voter) -> Result<(), StoreError> {
        let bytes = bincode::serialize(voter).map_err(LmdbError::from)?;
        self.env
            .voters_db
            .put(&mut self.txn, voter.address.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }
}

impl CandidateWriter for LmdbWriteTxn<'_> {
    fn allocate_candidate_id(&mut self) -> Result<CandidateId, StoreError> {
        let next = match read_meta(self.env, &self.txn, NEXT_CANDIDATE_ID_KEY)? {
            Some(bytes) => CandidateId::from_key(&bytes).ok_or_else(|| {
                StoreError::Corruption("next_candidate_id has unexpected byte length".into())
            })?,
            None => CandidateId::FIRST,
        };
        self.env
            .meta_db
            .put(
                &mut self.txn,
                NEXT_CANDIDATE_ID_KEY.as_bytes(),
                &next.next().to_key(),
            )
            .map_err(LmdbError::from)?;
        Ok(next)
    }

    fn put_candidate(&mut self, candidate: &Candidate) -> Result<(), StoreError> {
        let bytes = bincode::serialize(candidate).map_err(LmdbError::from)?;
        self.env
            .candidates_db
            .put(&mut self.txn, &candidate.id.to_key(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }
}

impl MetaWriter for LmdbWriteTxn<'_> {
    fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.env
            .meta_db
            .put(&mut self.txn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_meta(&mut self, key: &str) -> Result<(), StoreError> {
        self.env
            .meta_db
            .delete(&mut self.txn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }
}

impl WriteTxn for LmdbWriteTxn<'_> {
    fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
