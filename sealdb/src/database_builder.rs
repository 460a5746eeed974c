use crate::database::Database;
use crate::database_config::DatabaseConfig;
use crate::errors::{SealError, SealResult};
use crate::store::{DigestProvider, MemoryStorage, StorageBackend};
use std::sync::Arc;

/// Fluent builder for a [`Database`].
///
/// The first invalid setting is remembered and returned by
/// [`DatabaseBuilder::open`]; later settings are ignored once one failed.
#[derive(Default)]
pub struct DatabaseBuilder {
    error: Option<SealError>,
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder {
            error: None,
            config: DatabaseConfig::new(),
        }
    }

    pub fn storage_dir(mut self, dir: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_storage_dir(dir) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn storage_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_storage_backend(backend) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Keeps every collection file in process memory.
    pub fn in_memory(self) -> Self {
        self.storage_backend(Arc::new(MemoryStorage::new()))
    }

    pub fn digest(mut self, digest: Arc<dyn DigestProvider>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_digest(digest) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn default_secret(mut self, secret: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_default_secret(secret) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_auto_commit(auto_commit) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn log_secret(mut self, secret: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_log_secret(secret) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Opens the database, loading its deletion log.
    pub fn open(self) -> SealResult<Database> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Database::new(self.config)
    }
}
