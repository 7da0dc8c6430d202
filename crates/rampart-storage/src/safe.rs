//! Failure-tolerant JSON storage

use std::fmt;

use rampart_core::safe_json_stringify;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::KeyValueStore;

/// Lifetime of a storage area
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageArea {
    /// Survives restarts
    Local,
    /// Lives as long as the session
    Session,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Local => "local",
            StorageArea::Session => "session",
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON values over a [`KeyValueStore`].
///
/// No method fails: reads fall back, writes report success as a boolean.
/// Backend and parse failures are logged at warn level.
pub struct SafeStorage<S> {
    store: S,
    area: StorageArea,
}

impl<S: KeyValueStore> SafeStorage<S> {
    pub fn new(store: S, area: StorageArea) -> Self {
        SafeStorage { store, area }
    }

    pub fn local(store: S) -> Self {
        Self::new(store, StorageArea::Local)
    }

    pub fn session(store: S) -> Self {
        Self::new(store, StorageArea::Session)
    }

    /// Value under `key`, or `fallback` when absent, unreadable or not
    /// decodable as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let raw = match self.store.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return fallback,
            Err(err) => {
                tracing::warn!(area = %self.area, key, error = %err, "storage read failed");
                return fallback;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(area = %self.area, key, error = %err, "stored value is not valid JSON");
                fallback
            }
        }
    }

    /// Store `value` as JSON. Values that cannot be serialized are stored
    /// as `{}`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let raw = safe_json_stringify(value);
        match self.store.set_item(key, &raw) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(area = %self.area, key, error = %err, "storage write failed");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.store.remove_item(key) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(area = %self.area, key, error = %err, "storage remove failed");
                false
            }
        }
    }

    /// `true` when a raw value exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.store.get_item(key), Ok(Some(_)))
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> fmt::Debug for SafeStorage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeStorage")
            .field("area", &self.area)
            .finish_non_exhaustive()
    }
}
