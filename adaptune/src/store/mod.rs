//! Persistence behind a key-value blob store.
//!
//! Records are written as JSON under fixed keys. Loading is forgiving: a
//! missing, unreadable or malformed blob is logged and replaced by the
//! record's default, so a broken store never stops the host.
//!
//! ```text
//! load_or_default ──► store.get ──► serde_json ──► Persisted::check ──► T
//!                        │ error        │ error           │ error
//!                        └──────────────┴─────────────────┴──► warn! + T::default()
//! ```

mod providers;
mod traits;

pub use providers::{DirectoryStore, MemoryStore};
pub use traits::{
    validate_key, KeyValueStore, SharedStore, LEARNING_MODEL_KEY, OPTIMIZATION_HISTORY_KEY,
    VALIDATION_HISTORY_KEY,
};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// A record persisted under a fixed key.
pub trait Persisted: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;

    /// Validate a freshly deserialized record.
    fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Load a record, `Ok(None)` when it was never written.
pub fn load<T: Persisted>(store: &dyn KeyValueStore) -> Result<Option<T>, StoreError> {
    let Some(bytes) = store.get(T::KEY)? else {
        return Ok(None);
    };
    let record: T = serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
        key: T::KEY.to_string(),
        source,
    })?;
    record.check()?;
    Ok(Some(record))
}

/// Load a record, falling back to its default on any failure.
pub fn load_or_default<T: Persisted>(store: &dyn KeyValueStore) -> T {
    match load::<T>(store) {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::debug!(key = T::KEY, "No stored record, using defaults");
            T::default()
        }
        Err(e) => {
            tracing::warn!(key = T::KEY, error = %e, "Failed to load record, using defaults");
            T::default()
        }
    }
}

/// Serialize and write a record.
pub fn save<T: Persisted>(store: &dyn KeyValueStore, record: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(record).map_err(|source| StoreError::Serialization {
        key: T::KEY.to_string(),
        source,
    })?;
    store.set(T::KEY, &bytes)
}

/// Write a record, logging instead of failing.
///
/// Returns whether the write succeeded.
pub fn save_logged<T: Persisted>(store: &dyn KeyValueStore, record: &T) -> bool {
    match save(store, record) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(key = T::KEY, error = %e, "Failed to persist record");
            false
        }
    }
}
