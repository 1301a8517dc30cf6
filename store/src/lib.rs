//! Persistence collaborator for Rumorality.
//!
//! The engine only needs keyed byte records grouped into a handful of
//! collections; no cross-collection transactions. Concrete backends
//! implement [`RecordStore`]; the rest of the workspace depends only on
//! the trait and the typed helpers in [`record`].

pub mod collection;
pub mod error;
pub mod memory;
pub mod record;

pub use collection::Collection;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{get_all_records, get_record, put_record, RecordStore};
