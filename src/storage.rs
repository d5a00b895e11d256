//! Local key-value storage trait and built-in backends.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// A durable string-to-string slot store, in the spirit of browser local
/// storage.
///
/// Implementations are synchronous and local: a call either completes or
/// returns an `io::Error`, it never waits on a network.
pub trait KeyValueStorage: Send + Sync + 'static {
    /// Read the value stored under `key`, or `None` if the slot is empty.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Empty the slot. Removing an empty slot is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// In-process storage backed by a shared map.
///
/// Clones share the same map, so a test (or a second store instance) can
/// observe what another handle wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.read().expect("storage RwLock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.write().expect("storage RwLock poisoned");
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.write().expect("storage RwLock poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// File-backed storage: one JSON file per key under a base directory.
///
/// ```text
/// <base_dir>/
///     cart.json
///     cart.json.tmp   -- only while a write is in flight
/// ```
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers never see a partially written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `base_dir`.
    ///
    /// The directory does not need to exist yet; it is created on the first
    /// write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this storage.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the file backing `key`: `<base_dir>/<key>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] if the key is empty or would
    /// escape the base directory.
    pub fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {key:?}"),
            ));
        }
        Ok(self.base_dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.base_dir)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("cart").unwrap(), None);

        storage.set("cart", "{}").unwrap();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("{}"));

        storage.remove("cart").unwrap();
        assert_eq!(storage.get("cart").unwrap(), None);
        storage.remove("cart").expect("removing an empty slot is fine");
    }

    #[test]
    fn memory_storage_clones_share_entries() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("cart", "shared").unwrap();
        assert_eq!(other.get("cart").unwrap().as_deref(), Some("shared"));
    }

    #[test]
    fn path_for_rejects_escaping_keys() {
        let storage = FileStorage::new("/data");
        assert_eq!(storage.path_for("cart").unwrap(), PathBuf::from("/data/cart.json"));

        for key in ["", ".", "..", "../cart", "a/b", "a\\b"] {
            let err = storage.path_for(key).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "key {key:?}");
        }
    }

    #[test]
    fn file_storage_missing_key_is_none() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let storage = FileStorage::new(tmp.path().join("not-yet-created"));
        assert_eq!(storage.get("cart").unwrap(), None);
    }

    #[test]
    fn file_storage_roundtrip_creates_dir() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let storage = FileStorage::new(tmp.path().join("nested"));

        storage.set("cart", r#"{"items":[]}"#).unwrap();
        assert!(tmp.path().join("nested/cart.json").is_file());
        assert_eq!(
            storage.get("cart").unwrap().as_deref(),
            Some(r#"{"items":[]}"#)
        );
    }

    #[test]
    fn file_storage_overwrites_atomically() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let storage = FileStorage::new(tmp.path());

        storage.set("cart", "first").unwrap();
        storage.set("cart", "second").unwrap();

        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("second"));
        assert!(
            !tmp.path().join("cart.json.tmp").exists(),
            "temp file should not exist after successful write"
        );
    }

    #[test]
    fn file_storage_remove_is_idempotent() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let storage = FileStorage::new(tmp.path());

        storage.set("cart", "x").unwrap();
        storage.remove("cart").unwrap();
        storage.remove("cart").unwrap();
        assert_eq!(storage.get("cart").unwrap(), None);
    }
}
