//! The record store trait and typed bincode helpers.

use crate::{Collection, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Keyed byte records, grouped by [`Collection`].
///
/// Implementations must be safe to share across tasks. Single-record
/// operations are atomic; nothing spans more than one record.
pub trait RecordStore: Send + Sync {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Every record in the collection, ordered by key.
    fn get_all(&self, collection: Collection) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Insert or overwrite.
    fn put(&self, collection: Collection, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    fn clear(&self, collection: Collection) -> Result<(), StoreError>;
}

pub fn put_record<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = bincode::serialize(value)?;
    store.put(collection, key, &bytes)
}

pub fn get_record<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(collection, key)? {
        Some(bytes) => decode(collection, key, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Decode every record in a collection. A record that fails to decode
/// fails the whole call with [`StoreError::Corruption`].
pub fn get_all_records<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    store
        .get_all(collection)?
        .into_iter()
        .map(|(key, bytes)| decode(collection, &key, &bytes))
        .collect()
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    key: &str,
    bytes: &[u8],
) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corruption {
        collection: collection.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}
