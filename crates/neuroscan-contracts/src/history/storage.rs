use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::StoreError;

/// Key/value medium the history is persisted into. Each key holds one
/// serialized blob that is replaced wholesale on every write.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Readers never observe a half-written blob.
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, value)?;
        std::fs::rename(&staging, &path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .lock()
            .insert(key.to_string(), value.to_string());
        storage
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStorage, MemoryStorage, StorageBackend};

    #[test]
    fn file_storage_missing_key_reads_as_none() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = FileStorage::new(temp.path().join("nested"));
        assert_eq!(storage.read("absent")?, None);
        Ok(())
    }

    #[test]
    fn file_storage_overwrites_whole_blob() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = FileStorage::new(temp.path().join("nested"));
        storage.write("key", "[1,2,3]")?;
        storage.write("key", "[]")?;
        assert_eq!(storage.read("key")?.as_deref(), Some("[]"));
        assert!(storage.path_for("key").exists());
        assert!(!storage.path_for("key").with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn memory_storage_roundtrip() -> anyhow::Result<()> {
        let storage = MemoryStorage::with_entry("a", "one");
        storage.write("b", "two")?;
        assert_eq!(storage.read("a")?.as_deref(), Some("one"));
        assert_eq!(storage.read("b")?.as_deref(), Some("two"));
        assert_eq!(storage.read("c")?, None);
        Ok(())
    }
}
