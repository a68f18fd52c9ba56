//! Metadata storage traits.
//!
//! A small key-value area for bookkeeping that doesn't belong to voters or
//! candidates: the schema version, the candidate id counter, election info.

use crate::StoreError;

/// Meta key holding the schema version as a little-endian `u32`.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

pub trait MetaReader {
    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Get the current schema version. A store with no version reads as 0.
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta(SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }
}

pub trait MetaWriter: MetaReader {
    /// Store a metadata value.
    fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a metadata entry. Deleting a missing key is not an error.
    fn delete_meta(&mut self, key: &str) -> Result<(), StoreError>;

    fn set_schema_version(&mut self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_le_bytes())
    }
}
