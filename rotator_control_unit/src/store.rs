//! JSON file settings store.
//!
//! The whole map is rewritten on each `put`: serialized to a sibling
//! temporary file, then renamed over the target so a crash never leaves a
//! half-written file behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use rotator_common::store::{KeyValueStore, StoreError, StoredValue};

/// Store shared by the control loop and the handles.
pub type SharedStore = Arc<Mutex<Box<dyn KeyValueStore>>>;

/// Wrap a store for sharing.
pub fn shared(store: impl KeyValueStore + 'static) -> SharedStore {
    Arc::new(Mutex::new(Box::new(store)))
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, StoredValue>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if it does not exist.
    ///
    /// An unreadable or corrupt file is reported and replaced on the next
    /// write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("settings store {} is corrupt, starting empty: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("settings store {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| StoreError::Io(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.path.display())))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.get(key).copied()
    }

    fn put(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        if self.values.get(key) == Some(&value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}
