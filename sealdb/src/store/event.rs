use crate::common::SealEventBus;
use crate::errors::SealResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::Debug;
use std::sync::Arc;

/// Events published on a database's event bus.
///
/// - **DataTampered**: a stored collection failed signature verification
///   or could not be parsed, and was opened empty
/// - **DownloadSuccess** / **DownloadError**: outcome of a remote load
/// - **UploadSuccess** / **UploadError**: outcome of a remote save
/// - **DeleteSuccess** / **DeleteError**: outcome of replaying one
///   deletion-log entry against the remote
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DbEvents {
    DataTampered,
    DownloadSuccess,
    DownloadError,
    UploadSuccess,
    UploadError,
    DeleteSuccess,
    DeleteError,
}

/// An event with the collection or file it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct DbEventInfo {
    event: DbEvents,
    source: String,
    detail: Option<String>,
}

impl DbEventInfo {
    pub fn new(event: DbEvents, source: &str, detail: Option<String>) -> Self {
        DbEventInfo {
            event,
            source: source.to_string(),
            detail,
        }
    }

    pub fn event(&self) -> DbEvents {
        self.event
    }

    /// The file name for `DataTampered`, the collection name otherwise.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

pub trait DbEventCallback: Send + Sync + Fn(DbEventInfo) -> SealResult<()> {}

impl<F> DbEventCallback for F where F: Send + Sync + Fn(DbEventInfo) -> SealResult<()> {}

/// A listener registered through `Database::subscribe`.
///
/// ```ignore
/// let listener = DbEventListener::new(|info| {
///     if info.event() == DbEvents::DataTampered {
///         log::warn!("{} was tampered with", info.source());
///     }
///     Ok(())
/// });
/// let subscriber = db.subscribe(listener)?;
/// ```
#[derive(Clone)]
pub struct DbEventListener {
    on_event: Arc<dyn DbEventCallback>,
}

impl DbEventListener {
    pub fn new(on_event: impl DbEventCallback + 'static) -> Self {
        DbEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<DbEventInfo> for DbEventListener {
    fn handle(&self, event: &Event<DbEventInfo>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for DbEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbEventListener").finish()
    }
}

pub type DbEventBus = SealEventBus<DbEventInfo, DbEventListener>;

/// Publishes `event`, logging instead of failing when a listener errors.
pub(crate) fn notify(bus: &DbEventBus, event: DbEvents, source: &str, detail: Option<String>) {
    if let Err(e) = bus.publish(DbEventInfo::new(event, source, detail)) {
        log::warn!("Failed to publish {:?} for {}: {}", event, source, e);
    }
}
