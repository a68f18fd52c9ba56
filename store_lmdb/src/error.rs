use heed::MdbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reader slots or locks are exhausted for now.
    #[error("LMDB busy: {0}")]
    Busy(String),

    /// Map, page, transaction or database limits reached.
    #[error("LMDB capacity exhausted: {0}")]
    Capacity(String),

    #[error("LMDB environment is corrupted or incompatible: {0}")]
    Corrupted(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("store error: {0}")]
    Store(#[from] ballot_store::StoreError),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        match e {
            heed::Error::Io(io) => LmdbError::Io(io),
            heed::Error::Mdb(mdb) => match mdb {
                MdbError::ReadersFull | MdbError::TlsFull | MdbError::BadRslot => {
                    LmdbError::Busy(mdb.to_string())
                }
                MdbError::MapFull
                | MdbError::MapResized
                | MdbError::DbsFull
                | MdbError::TxnFull
                | MdbError::CursorFull
                | MdbError::PageFull => LmdbError::Capacity(mdb.to_string()),
                MdbError::Corrupted
                | MdbError::PageNotFound
                | MdbError::Panic
                | MdbError::VersionMismatch
                | MdbError::Invalid
                | MdbError::Incompatible => LmdbError::Corrupted(mdb.to_string()),
                other => LmdbError::Heed(other.to_string()),
            },
            heed::Error::Encoding(err) | heed::Error::Decoding(err) => {
                LmdbError::Serialization(err.to_string())
            }
            other => LmdbError::Heed(other.to_string()),
        }
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<LmdbError> for ballot_store::StoreError {
    fn from(e: LmdbError) -> Self {
        use ballot_store::StoreError;
        match e {
            LmdbError::Io(io) => StoreError::Unavailable(io.to_string()),
            LmdbError::Busy(msg) => StoreError::Unavailable(msg),
            LmdbError::Capacity(msg) => StoreError::Capacity(msg),
            LmdbError::Corrupted(msg) => StoreError::Corruption(msg),
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            LmdbError::UnsupportedSchema { .. } => StoreError::Corruption(e.to_string()),
            LmdbError::Store(inner) => inner,
            LmdbError::Heed(msg) => StoreError::Backend(msg),
        }
    }
}
