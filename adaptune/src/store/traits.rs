//! Core traits for persisted engine state.
//!
//! The `KeyValueStore` trait is the only persistence capability the engine
//! depends on. Hosts inject whatever backend they have (browser storage,
//! a file, a database row) behind it.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable and limited to `[A-Za-z0-9_-]`
//! - **Byte values**: The store imposes no format; the engine writes JSON
//! - **Synchronous**: Blobs are small and written once per pass

use std::sync::Arc;

use crate::error::StoreError;

/// Key of the persisted [`LearningModel`](crate::learning::LearningModel).
pub const LEARNING_MODEL_KEY: &str = "learning_model";

/// Key of the optimization history log.
pub const OPTIMIZATION_HISTORY_KEY: &str = "optimization_history";

/// Key of the validation history log.
pub const VALIDATION_HISTORY_KEY: &str = "validation_history";

/// Get/set of byte blobs by string key.
pub trait KeyValueStore: Send + Sync {
    /// Read a blob. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a blob, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a blob. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Reject keys that are empty or could escape a directory.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_key(LEARNING_MODEL_KEY).is_ok());
        assert!(validate_key("device-42").is_ok());
    }

    #[test]
    fn test_invalid_keys() {
        for key in ["", "../etc/passwd", "a/b", "with space", "dot.json"] {
            assert!(
                matches!(validate_key(key), Err(StoreError::InvalidKey(_))),
                "{:?} accepted",
                key
            );
        }
    }
}
