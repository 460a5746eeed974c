//! Configuration of a SealDB database.

use crate::common::{DEFAULT_LOG_SECRET, DEFAULT_SECRET, DEFAULT_STORAGE_DIR};
use crate::errors::{ErrorKind, SealError, SealResult};
use crate::store::{DigestProvider, FileStorage, Sha256Digest, StorageBackend};
use parking_lot::RwLock;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Settings shared by every collection of a database.
///
/// Clones share the same settings. Once the database opened, the
/// configuration is frozen and every setter fails with
/// [`ErrorKind::InvalidOperation`].
///
/// # Examples
///
/// ```rust,ignore
/// let db = Database::builder()
///     .storage_dir("/var/lib/app")
///     .default_secret("s3cret")
///     .open()?;
/// ```
#[derive(Clone)]
pub struct DatabaseConfig {
    inner: Arc<DatabaseConfigInner>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseConfig {
    /// Creates a configuration with default values: files under
    /// `./sealdb-data`, SHA-256 signatures and auto-commit on.
    pub fn new() -> Self {
        DatabaseConfig {
            inner: Arc::new(DatabaseConfigInner::new()),
        }
    }

    /// Directory used when a collection is opened without one.
    pub fn storage_dir(&self) -> String {
        self.inner.storage_dir.read().clone()
    }

    pub fn set_storage_dir(&self, dir: &str) -> SealResult<()> {
        self.inner.check_unfrozen("storage directory")?;
        check_not_empty(dir, "Storage directory")?;
        *self.inner.storage_dir.write() = dir.to_string();
        Ok(())
    }

    pub fn storage_backend(&self) -> Arc<dyn StorageBackend> {
        self.inner.backend.read().clone()
    }

    pub fn set_storage_backend(&self, backend: Arc<dyn StorageBackend>) -> SealResult<()> {
        self.inner.check_unfrozen("storage backend")?;
        *self.inner.backend.write() = backend;
        Ok(())
    }

    pub fn digest(&self) -> Arc<dyn DigestProvider> {
        self.inner.digest.read().clone()
    }

    pub fn set_digest(&self, digest: Arc<dyn DigestProvider>) -> SealResult<()> {
        self.inner.check_unfrozen("digest provider")?;
        *self.inner.digest.write() = digest;
        Ok(())
    }

    /// Secret used for collections opened implicitly, e.g. when a
    /// [`DbRef`](crate::collection::DbRef) is resolved.
    pub fn default_secret(&self) -> String {
        self.inner.default_secret.read().clone()
    }

    pub fn set_default_secret(&self, secret: &str) -> SealResult<()> {
        self.inner.check_unfrozen("default secret")?;
        check_not_empty(secret, "Default secret")?;
        *self.inner.default_secret.write() = secret.to_string();
        Ok(())
    }

    /// Initial auto-commit flag of newly opened collections.
    pub fn auto_commit(&self) -> bool {
        self.inner.auto_commit.load(Ordering::Relaxed)
    }

    pub fn set_auto_commit(&self, auto_commit: bool) -> SealResult<()> {
        self.inner.check_unfrozen("auto-commit")?;
        self.inner.auto_commit.store(auto_commit, Ordering::Relaxed);
        Ok(())
    }

    /// Secret signing the deletion log.
    pub fn log_secret(&self) -> String {
        self.inner.log_secret.read().clone()
    }

    pub fn set_log_secret(&self, secret: &str) -> SealResult<()> {
        self.inner.check_unfrozen("log secret")?;
        check_not_empty(secret, "Log secret")?;
        *self.inner.log_secret.write() = secret.to_string();
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::Relaxed)
    }

    pub(crate) fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::Relaxed);
    }
}

impl Debug for DatabaseConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("storage_dir", &self.storage_dir())
            .field("auto_commit", &self.auto_commit())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

struct DatabaseConfigInner {
    frozen: AtomicBool,
    storage_dir: RwLock<String>,
    backend: RwLock<Arc<dyn StorageBackend>>,
    digest: RwLock<Arc<dyn DigestProvider>>,
    default_secret: RwLock<String>,
    auto_commit: AtomicBool,
    log_secret: RwLock<String>,
}

impl DatabaseConfigInner {
    fn new() -> Self {
        DatabaseConfigInner {
            frozen: AtomicBool::new(false),
            storage_dir: RwLock::new(DEFAULT_STORAGE_DIR.to_string()),
            backend: RwLock::new(Arc::new(FileStorage)),
            digest: RwLock::new(Arc::new(Sha256Digest)),
            default_secret: RwLock::new(DEFAULT_SECRET.to_string()),
            auto_commit: AtomicBool::new(true),
            log_secret: RwLock::new(DEFAULT_LOG_SECRET.to_string()),
        }
    }

    fn check_unfrozen(&self, setting: &str) -> SealResult<()> {
        if self.frozen.load(Ordering::Relaxed) {
            log::error!("The {} cannot be changed after the database opened", setting);
            return Err(SealError::new(
                &format!("The {} cannot be changed after the database opened", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

fn check_not_empty(value: &str, setting: &str) -> SealResult<()> {
    if value.is_empty() {
        log::error!("{} cannot be empty", setting);
        return Err(SealError::new(
            &format!("{} cannot be empty", setting),
            ErrorKind::ValidationError,
        ));
    }
    Ok(())
}
