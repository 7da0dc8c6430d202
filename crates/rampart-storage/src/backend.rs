//! Key/value backends
//!
//! [`KeyValueStore`] is the raw string store a [`SafeStorage`](crate::SafeStorage)
//! sits on. Every method may fail: storage can be full, disabled or backed
//! by a file the process cannot write.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rampart_core::{RampartError, RampartResult};

/// A string key/value store
pub trait KeyValueStore: Send + Sync {
    /// Raw value stored under `key`, `None` when absent
    fn get_item(&self, key: &str) -> RampartResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> RampartResult<()>;

    /// Removing an absent key succeeds
    fn remove_item(&self, key: &str) -> RampartResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get_item(&self, key: &str) -> RampartResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> RampartResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> RampartResult<()> {
        (**self).remove_item(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get_item(&self, key: &str) -> RampartResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> RampartResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> RampartResult<()> {
        (**self).remove_item(key)
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// In-memory store with an optional byte quota.
///
/// The quota counts key and value bytes of every entry, the way browser
/// storage areas do.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store refusing writes that would take it past `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        MemoryStore {
            items: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Bytes currently used
    pub fn used_bytes(&self) -> usize {
        self.items
            .read()
            .iter()
            .map(|(k, v)| entry_size(k, v))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> RampartResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> RampartResult<()> {
        let mut items = self.items.write();

        if let Some(limit) = self.quota {
            let used: usize = items.iter().map(|(k, v)| entry_size(k, v)).sum();
            let replaced = items.get(key).map_or(0, |old| entry_size(key, old));
            let needed = used - replaced + entry_size(key, value);
            if needed > limit {
                return Err(RampartError::QuotaExceeded { needed, limit });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> RampartResult<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk.
///
/// Every write rewrites the document through a temporary file and a rename,
/// so a crash leaves either the old or the new document. The in-memory copy
/// only changes once the write has landed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the document at `path`. A missing file is an empty store;
    /// an unreadable or malformed one is an error.
    pub fn open(path: impl Into<PathBuf>) -> RampartResult<Self> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(path = %path.display(), entries = items.len(), "opened file store");
        Ok(FileStore {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> RampartResult<()> {
        let document = serde_json::to_string_pretty(items)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, document)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> RampartResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> RampartResult<()> {
        let mut items = self.items.lock();
        let mut next = items.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *items = next;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> RampartResult<()> {
        let mut items = self.items.lock();
        if !items.contains_key(key) {
            return Ok(());
        }
        let mut next = items.clone();
        next.remove(key);
        self.persist(&next)?;
        *items = next;
        Ok(())
    }
}

/// Store that refuses every operation, like storage in a locked-down
/// browsing mode
#[derive(Clone, Debug)]
pub struct DisabledStore {
    reason: String,
}

impl DisabledStore {
    pub fn new(reason: impl Into<String>) -> Self {
        DisabledStore {
            reason: reason.into(),
        }
    }
}

impl Default for DisabledStore {
    fn default() -> Self {
        DisabledStore::new("storage is disabled")
    }
}

impl KeyValueStore for DisabledStore {
    fn get_item(&self, _key: &str) -> RampartResult<Option<String>> {
        Err(RampartError::StorageUnavailable(self.reason.clone()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> RampartResult<()> {
        Err(RampartError::StorageUnavailable(self.reason.clone()))
    }

    fn remove_item(&self, _key: &str) -> RampartResult<()> {
        Err(RampartError::StorageUnavailable(self.reason.clone()))
    }
}
