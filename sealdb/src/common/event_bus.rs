use crate::common::SEAL_EVENT;
use crate::errors::{ErrorKind, SealError, SealResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publishes database events to registered listeners.
///
/// The bus is a thin wrapper over a `basu` event bus with a single event
/// channel. Publishing with no listener registered returns immediately
/// without allocating the event envelope.
///
/// # Example
///
/// ```ignore
/// let bus: SealEventBus<DbEventInfo, DbEventListener> = SealEventBus::new();
/// let subscriber = bus.register(listener)?;
/// bus.publish(DbEventInfo::new(DbEvents::DataTampered, "users.json", None))?;
/// bus.deregister(subscriber.unwrap())?;
/// ```
#[derive(Clone)]
pub struct SealEventBus<E, L> {
    inner: Arc<SealEventBusInner<E, L>>,
}

impl<E, L> Default for SealEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> SealEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        SealEventBus {
            inner: Arc::new(SealEventBusInner::new()),
        }
    }

    pub fn register(&self, listener: L) -> SealResult<Option<SubscriberRef>> {
        self.inner.register(listener)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> SealResult<()> {
        self.inner.deregister(subscriber)
    }

    pub fn publish(&self, event: E) -> SealResult<()> {
        self.inner.publish(event)
    }

    /// Removes every registered listener.
    pub fn close(&self) -> SealResult<()> {
        self.inner.close()
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.has_listeners()
    }
}

/// Handle returned on registration, used to deregister a listener.
pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct SealEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> SealEventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        SealEventBusInner {
            event_bus: EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> SealResult<Option<SubscriberRef>> {
        match self.event_bus.subscribe(SEAL_EVENT, Box::new(listener)) {
            Ok(handler_id) => Ok(Some(SubscriberRef::new(handler_id))),
            Err(e) => Err(Self::seal_error(e)),
        }
    }

    #[inline]
    fn deregister(&self, subscriber: SubscriberRef) -> SealResult<()> {
        self.event_bus
            .unsubscribe(SEAL_EVENT, &subscriber.inner)
            .map_err(Self::seal_error)
    }

    #[inline]
    fn publish(&self, event: E) -> SealResult<()> {
        let handler_count = match self.event_bus.get_handler_count(SEAL_EVENT) {
            Ok(count) => count,
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::seal_error(e)),
        };
        if handler_count == 0 {
            return Ok(());
        }

        self.event_bus
            .publish(SEAL_EVENT, &Event::new(event))
            .map_err(Self::seal_error)
    }

    #[inline]
    fn close(&self) -> SealResult<()> {
        self.event_bus.clear().map_err(Self::seal_error)
    }

    #[inline]
    fn has_listeners(&self) -> bool {
        match self.event_bus.get_handler_count(SEAL_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to check listeners: {}, defaulting to false", e);
                false
            }
        }
    }

    fn seal_error(e: BasuError) -> SealError {
        match e {
            BasuError::EventTypeNotFOUND => SealError::new(
                "Event bus error: no handler is registered for the event type",
                ErrorKind::EventError,
            ),
            BasuError::MutexPoisoned => SealError::new(
                "Event bus error: internal mutex poisoned",
                ErrorKind::EventError,
            ),
            BasuError::HandlerError(e) => SealError::new(
                &format!("Event handler error: {}", e),
                ErrorKind::EventError,
            ),
        }
    }
}
