//! Key/value persistence
//!
//! The game only ever reads whole values at session start and writes them back
//! on change. Values are JSON strings; anything missing or unparseable falls
//! back to the caller's default.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys
pub const HIGH_SCORE_KEY: &str = "star_snake_high_score";
pub const LEADERBOARD_KEY: &str = "star_snake_leaderboard";
pub const PREFERENCES_KEY: &str = "star_snake_preferences";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("failed to write key {key}: {reason}")]
    Write { key: String, reason: String },
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string key/value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store for native builds and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    pub fn open() -> Result<Self, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .map(|storage| Self { storage })
            .ok_or(StoreError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(key)
            .map_err(|_| StoreError::Unavailable)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StoreError::Write {
                key: key.to_string(),
                reason: format!("{:?}", e),
            })
    }
}

/// Read and decode a value, falling back to `T::default()` on any problem
pub fn load_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring corrupt value for {}: {}", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Could not read {}: {}", key, e);
            T::default()
        }
    }
}

pub fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemoryStore::new();
        save_json(&mut store, HIGH_SCORE_KEY, &42u64).unwrap();
        let score: u64 = load_json(&store, HIGH_SCORE_KEY);
        assert_eq!(score, 42);
    }

    #[test]
    fn test_missing_and_corrupt_fall_back() {
        let mut store = MemoryStore::new();
        let score: u64 = load_json(&store, HIGH_SCORE_KEY);
        assert_eq!(score, 0);

        store.set(HIGH_SCORE_KEY, "not json").unwrap();
        let score: u64 = load_json(&store, HIGH_SCORE_KEY);
        assert_eq!(score, 0);
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                key: key.to_string(),
                reason: "quota".to_string(),
            })
        }
    }

    #[test]
    fn test_backend_errors() {
        let mut store = BrokenStore;
        let score: u64 = load_json(&store, HIGH_SCORE_KEY);
        assert_eq!(score, 0);
        let err = save_json(&mut store, HIGH_SCORE_KEY, &1u64).unwrap_err();
        assert!(err.to_string().contains(HIGH_SCORE_KEY));
    }
}
