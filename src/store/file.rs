use super::interface::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// JSON-file backed store. The whole map lives in memory and is written
/// through to disk on every mutation.
///
/// Each write goes to a sibling `.tmp` file that is then renamed over the
/// store, so the file on disk is always a complete snapshot.
pub struct FileStore {
    path: PathBuf,
    temp_path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    /// A missing or corrupt file starts out as an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(map) => {
                    tracing::debug!(
                        "[Store] Loaded {} entries from {}",
                        map.len(),
                        path.display()
                    );
                    map
                }
                Err(e) => {
                    tracing::warn!(
                        "[Store] Unreadable store {}: {}; starting empty",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        Self {
            temp_path: path.with_file_name(temp_name),
            path,
            entries: RwLock::new(entries),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.temp_path, json)?;
        if let Err(e) = std::fs::rename(&self.temp_path, &self.path) {
            let _ = std::fs::remove_file(&self.temp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// On a failed write the in-memory map is rolled back, so memory never
    /// runs ahead of disk.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            tracing::warn!("[Store] Failed to write {}: {}", self.path.display(), e);
            return Err(e);
        }
        Ok(())
    }
}
