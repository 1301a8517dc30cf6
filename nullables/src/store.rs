//! Nullable store: an in-memory record store with failure injection.

use rumorality_store::{Collection, MemoryStore, RecordStore, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps [`MemoryStore`] and can be told to fail reads or writes.
#[derive(Default)]
pub struct NullStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Successful `put`/`delete`/`clear` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.inner.len(collection).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RecordStore for NullStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_read()?;
        self.inner.get(collection, key)
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        self.check_read()?;
        self.inner.get_all(collection)
    }

    fn put(&self, collection: Collection, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.put(collection, key, value)
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.delete(collection, key)
    }

    fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.clear(collection)
    }
}
