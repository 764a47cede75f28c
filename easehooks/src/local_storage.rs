use crate::StorageError;
use futures_signals::signal::{Mutable, MutableSignalCloned};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A string key-value store, such as a browser's local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// A [`KeyValueStore`] that lives in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// A value mirrored into a [`KeyValueStore`] under one key.
///
/// Strings are stored as-is, anything else as JSON. Reading decodes JSON and
/// falls back to the raw stored string when that fails. An empty stored
/// string reads as absent. Setting `None` removes the key.
pub struct LocalStorageState<T> {
    key: String,
    storage: Arc<dyn KeyValueStore>,
    value: Mutable<Option<T>>,
}

impl<T> LocalStorageState<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Starts from whatever is stored under `key`.
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        let value = match storage.get(&key)? {
            Some(raw) if !raw.is_empty() => decode(&key, raw),
            _ => None,
        };
        Ok(LocalStorageState {
            key,
            storage,
            value: Mutable::new(value),
        })
    }

    /// Starts from `initial`, overwriting what is stored under `key`.
    pub fn with_initial(
        storage: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        initial: T,
    ) -> Result<Self, StorageError> {
        let state = LocalStorageState {
            key: key.into(),
            storage,
            value: Mutable::new(None),
        };
        state.set(Some(initial))?;
        Ok(state)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Option<T> {
        self.value.get_cloned()
    }

    pub fn set(&self, value: Option<T>) -> Result<(), StorageError> {
        match &value {
            Some(inner) => {
                let encoded = encode(&self.key, inner)?;
                self.storage.set(&self.key, &encoded)?;
            }
            None => self.storage.remove(&self.key)?,
        }
        self.value.set(value);
        Ok(())
    }

    pub fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(Option<T>) -> Option<T>,
    {
        self.set(f(self.get()))
    }

    pub fn to_signal(&self) -> MutableSignalCloned<Option<T>> {
        self.value.signal_cloned()
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    let json = serde_json::to_value(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(match json {
        Value::String(text) => text,
        other => other.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &str, raw: String) -> Option<T> {
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            trace!(key, %error, "stored value is not JSON, using the raw string");
            match serde_json::from_value(Value::String(raw)) {
                Ok(value) => Some(value),
                Err(error) => {
                    debug!(key, %error, "stored value does not fit the expected type");
                    None
                }
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalStorageState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorageState")
            .field("key", &self.key)
            .field("value", &*self.value.lock_ref())
            .finish()
    }
}
