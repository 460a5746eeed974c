use crate::collection::Collection;
use crate::common::{SubscriberRef, RESERVED_LOG_COLLECTION};
use crate::database_builder::DatabaseBuilder;
use crate::database_config::DatabaseConfig;
use crate::errors::{ErrorKind, SealError, SealResult};
use crate::store::{DbEventBus, DbEventListener, PersistenceCodec};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Registry of the open collections of one storage setup.
///
/// A collection is opened the first time it is asked for and then kept
/// for the lifetime of the database, so every caller asking for the same
/// name shares one [`Collection`]. The database also owns the event bus
/// shared by its collections and the deletion log used by remote sync.
///
/// # Examples
///
/// ```rust,ignore
/// let db = Database::builder().storage_dir("./data").open()?;
/// let orders = db.get_or_open("orders", "s3cret", None)?;
/// let owner = DbRef::new("users", "u1").resolve(&db)?;
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn new(config: DatabaseConfig) -> SealResult<Self> {
        config.freeze();
        let event_bus = DbEventBus::new();
        let codec = PersistenceCodec::new(config.storage_backend(), config.digest(), event_bus.clone());

        let deletion_log = Collection::open(
            RESERVED_LOG_COLLECTION,
            &config.log_secret(),
            &config.storage_dir(),
            codec.clone(),
            false,
            None,
        )?;
        log::debug!("Opened database at {}", config.storage_dir());

        Ok(Database {
            inner: Arc::new(DatabaseInner {
                config,
                collections: RwLock::new(HashMap::new()),
                event_bus,
                codec,
                deletion_log,
            }),
        })
    }

    /// Returns the open collection `name`, opening it from `dir` (or the
    /// configured storage directory) with `secret` on first use.
    ///
    /// An already open collection is returned as is, whatever `secret` and
    /// `dir` are passed.
    pub fn get_or_open(&self, name: &str, secret: &str, dir: Option<&str>) -> SealResult<Collection> {
        self.inner.open_collection(name, secret, dir, false)
    }

    /// Like [`Database::get_or_open`], with `override_reserved` allowing
    /// access to the internal deletion log by name.
    pub fn open_collection(
        &self,
        name: &str,
        secret: &str,
        dir: Option<&str>,
        override_reserved: bool,
    ) -> SealResult<Collection> {
        self.inner.open_collection(name, secret, dir, override_reserved)
    }

    /// Opens `name` with the configured default secret.
    pub fn collection(&self, name: &str) -> SealResult<Collection> {
        let secret = self.inner.config.default_secret();
        self.inner.open_collection(name, &secret, None, false)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.inner.collections.read().contains_key(name)
    }

    /// Names of the open collections, sorted. The deletion log is not listed.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The reserved collection recording removals awaiting remote replay.
    pub fn deletion_log(&self) -> Collection {
        self.inner.deletion_log.clone()
    }

    pub fn subscribe(&self, listener: DbEventListener) -> SealResult<Option<SubscriberRef>> {
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> SealResult<()> {
        self.inner.event_bus.deregister(subscriber)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Commits every open collection and the deletion log, then drops all
    /// event listeners. Handles stay usable afterwards.
    pub fn close(&self) -> SealResult<()> {
        let collections: Vec<Collection> = self.inner.collections.read().values().cloned().collect();
        for collection in collections {
            collection.commit()?;
        }
        self.inner.deletion_log.commit()?;
        self.inner.event_bus.close()?;
        log::debug!("Closed database at {}", self.inner.config.storage_dir());
        Ok(())
    }
}

impl Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.inner.config)
            .field("collections", &self.collection_names())
            .finish()
    }
}

struct DatabaseInner {
    config: DatabaseConfig,
    collections: RwLock<HashMap<String, Collection>>,
    event_bus: DbEventBus,
    codec: PersistenceCodec,
    deletion_log: Collection,
}

impl DatabaseInner {
    fn open_collection(
        &self,
        name: &str,
        secret: &str,
        dir: Option<&str>,
        override_reserved: bool,
    ) -> SealResult<Collection> {
        if name.is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(SealError::new(
                "Collection name cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        if name == RESERVED_LOG_COLLECTION {
            if !override_reserved {
                log::error!("{} is a reserved collection name", name);
                return Err(SealError::new(
                    &format!("{} is a reserved collection name", name),
                    ErrorKind::ValidationError,
                ));
            }
            return Ok(self.deletion_log.clone());
        }

        if let Some(collection) = self.collections.read().get(name) {
            return Ok(collection.clone());
        }

        let mut collections = self.collections.write();
        if let Some(collection) = collections.get(name) {
            return Ok(collection.clone());
        }

        let dir = match dir {
            Some(dir) => dir.to_string(),
            None => self.config.storage_dir(),
        };
        let collection = Collection::open(
            name,
            secret,
            &dir,
            self.codec.clone(),
            self.config.auto_commit(),
            Some(self.deletion_log.clone()),
        )?;
        collections.insert(name.to_string(), collection.clone());
        Ok(collection)
    }
}
