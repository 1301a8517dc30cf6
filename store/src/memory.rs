//! In-memory record store.

use crate::{Collection, RecordStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type Tables = HashMap<Collection, BTreeMap<String, Vec<u8>>>;

/// A thread-safe in-memory backend. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    /// Number of records in a collection.
    pub fn len(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self.lock()?.get(&collection).map_or(0, BTreeMap::len))
    }

    pub fn is_empty(&self, collection: Collection) -> Result<bool, StoreError> {
        Ok(self.len(collection)? == 0)
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .lock()?
            .get(&collection)
            .and_then(|table| table.get(key))
            .cloned())
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()?
            .get(&collection)
            .map(|table| table.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn put(&self, collection: Collection, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock()?
            .entry(collection)
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        if let Some(table) = self.lock()?.get_mut(&collection) {
            table.remove(key);
        }
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.lock()?.remove(&collection);
        Ok(())
    }
}
