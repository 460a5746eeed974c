use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::SealResult;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// Raw byte storage for persisted collection files.
pub trait StorageBackend: Send + Sync {
    /// Reads `<dir>/<file_name>`; `None` when the file does not exist.
    fn read(&self, file_name: &str, dir: &str) -> SealResult<Option<Vec<u8>>>;

    /// Replaces the content of `<dir>/<file_name>`, creating the directory
    /// when needed.
    fn write(&self, file_name: &str, dir: &str, bytes: &[u8]) -> SealResult<()>;
}

/// Stores each file on the local file system.
///
/// A write goes to a sibling temporary file which is then renamed over the
/// target, so a reader sees either the previous or the new content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStorage;

impl StorageBackend for FileStorage {
    fn read(&self, file_name: &str, dir: &str) -> SealResult<Option<Vec<u8>>> {
        let path = Path::new(dir).join(file_name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                log::debug!("No stored file at {}", path.display());
                Ok(None)
            }
            Err(e) => {
                log::error!("Failed to read {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }

    fn write(&self, file_name: &str, dir: &str, bytes: &[u8]) -> SealResult<()> {
        fs::create_dir_all(dir)?;
        let path = Path::new(dir).join(file_name);
        let staging = Path::new(dir).join(format!(".{}.tmp", file_name));
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path).map_err(|e| {
            log::error!("Failed to move {} into place: {}", path.display(), e);
            e.into()
        })
    }
}

/// Keeps files in process memory. Clones share the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Atomic<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            files: atomic(HashMap::new()),
        }
    }

    /// Stored paths, as `<dir>/<file_name>`.
    pub fn paths(&self) -> Vec<String> {
        self.files.read_with(|files| {
            let mut paths: Vec<String> = files.keys().cloned().collect();
            paths.sort();
            paths
        })
    }

    fn key(file_name: &str, dir: &str) -> String {
        format!("{}/{}", dir.trim_end_matches('/'), file_name)
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, file_name: &str, dir: &str) -> SealResult<Option<Vec<u8>>> {
        let key = Self::key(file_name, dir);
        Ok(self.files.read_with(|files| files.get(&key).cloned()))
    }

    fn write(&self, file_name: &str, dir: &str, bytes: &[u8]) -> SealResult<()> {
        let key = Self::key(file_name, dir);
        self.files.write_with(|files| files.insert(key, bytes.to_vec()));
        Ok(())
    }
}
