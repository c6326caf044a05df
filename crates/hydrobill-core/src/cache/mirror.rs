//! Durable mirror backends.
//!
//! A mirror is a flat string-to-string store in the shape of browser local
//! storage. [`TtlCache`](super::TtlCache) namespaces its keys before they get
//! here, so a backend may be shared with unrelated data.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::error::MirrorError;

/// File extension used for mirrored entries.
const ENTRY_EXTENSION: &str = "json";

pub trait DurableMirror: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, MirrorError>;

    fn write(&self, key: &str, value: &str) -> Result<(), MirrorError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), MirrorError>;

    fn keys(&self) -> Result<Vec<String>, MirrorError>;
}

/// One JSON file per key inside a directory.
///
/// Keys are percent-encoded into file names, so any string is a valid key.
/// [`keys`](DurableMirror::keys) ignores files that don't carry the `.json`
/// extension and files whose names don't decode back to a UTF-8 key.
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    pub fn new(dir: PathBuf) -> Result<Self, MirrorError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(key), ENTRY_EXTENSION))
    }
}

impl DurableMirror for FileMirror {
    fn read(&self, key: &str) -> Result<Option<String>, MirrorError> {
        match std::fs::read_to_string(self.entry_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        std::fs::write(self.entry_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        match std::fs::remove_file(self.entry_path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, MirrorError> {
        let mut keys = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match urlencoding::decode(stem) {
                Ok(key) => keys.push(key.into_owned()),
                Err(_) => debug!(file = %path.display(), "Skipping undecodable mirror file"),
            }
        }
        Ok(keys)
    }
}

/// Process-local mirror. Clones share storage, which lets a test drop a
/// cache and rebuild it against the same "disk".
#[derive(Debug, Clone, Default)]
pub struct MemoryMirror {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryMirror {
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

impl DurableMirror for MemoryMirror {
    fn read(&self, key: &str) -> Result<Option<String>, MirrorError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, MirrorError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mirror_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().join("mirror")).unwrap();

        assert_eq!(mirror.read("cache_subscribers").unwrap(), None);

        mirror.write("cache_subscribers", "[1,2,3]").unwrap();
        assert_eq!(
            mirror.read("cache_subscribers").unwrap().as_deref(),
            Some("[1,2,3]")
        );

        mirror.remove("cache_subscribers").unwrap();
        assert_eq!(mirror.read("cache_subscribers").unwrap(), None);

        // Second remove is a no-op
        mirror.remove("cache_subscribers").unwrap();
    }

    #[test]
    fn test_file_mirror_keys_with_awkward_characters() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().to_path_buf()).unwrap();

        mirror.write("cache_readings/s1?from=2024-01", "{}").unwrap();
        mirror.write("cache_quality log", "{}").unwrap();

        let mut keys = mirror.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["cache_quality log", "cache_readings/s1?from=2024-01"]);
    }

    #[test]
    fn test_file_mirror_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().to_path_buf()).unwrap();

        std::fs::write(dir.path().join("hydrobill.log"), "not ours").unwrap();
        mirror.write("cache_a", "1").unwrap();

        assert_eq!(mirror.keys().unwrap(), vec!["cache_a"]);
    }

    #[test]
    fn test_file_mirror_ignores_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().to_path_buf()).unwrap();

        std::fs::write(dir.path().join("%FF.json"), "{}").unwrap();
        mirror.write("cache_a", "1").unwrap();

        assert_eq!(mirror.keys().unwrap(), vec!["cache_a"]);
    }

    #[test]
    fn test_memory_mirror_clones_share_storage() {
        let mirror = MemoryMirror::new();
        let other = mirror.clone();

        mirror.write("k", "v").unwrap();
        assert_eq!(other.read("k").unwrap().as_deref(), Some("v"));
        assert_eq!(other.len(), 1);
    }
}
