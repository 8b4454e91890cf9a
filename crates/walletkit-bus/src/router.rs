//! # Event Router
//!
//! Callback fan-out plus broadcast subscriptions over one dispatch point.
//!
//! The handler set lives in a `DashMap`. Dispatch clones the matching
//! handlers out of the map first and invokes them with no shard lock held,
//! which is what makes add/remove from inside a handler safe.

use crate::events::{EventFilter, RoutedEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// Failure reported by an event handler. Logged by the router, never
/// propagated.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Receives events from an [`EventRouter`].
///
/// Runs on the dispatching thread. Handlers that need to await should hand
/// the event off (spawn, channel) rather than block.
pub trait EventHandler<E>: Send + Sync {
    fn on_event(&self, event: &E) -> Result<(), HandlerError>;
}

impl<E, F> EventHandler<E> for F
where
    F: Fn(&E) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_event(&self, event: &E) -> Result<(), HandlerError> {
        self(event)
    }
}

/// Identifier of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

struct Registered<E> {
    filter: EventFilter,
    handler: Arc<dyn EventHandler<E>>,
}

struct HandlerSet<E> {
    entries: DashMap<HandlerId, Registered<E>>,
    next_id: AtomicU64,
}

impl<E> HandlerSet<E> {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

/// Type-erased removal so registrations do not carry the event type.
trait Deregister: Send + Sync {
    fn deregister(&self, id: HandlerId) -> bool;
    fn contains(&self, id: HandlerId) -> bool;
}

impl<E: 'static> Deregister for HandlerSet<E> {
    fn deregister(&self, id: HandlerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn contains(&self, id: HandlerId) -> bool {
        self.entries.contains_key(&id)
    }
}

/// Handle to a registered handler.
///
/// Disposing or dropping it removes the handler. Use [`detach`](Self::detach)
/// to keep the handler for the router's lifetime.
#[must_use = "dropping a registration removes its handler"]
pub struct HandlerRegistration {
    id: HandlerId,
    set: Weak<dyn Deregister>,
    released: bool,
}

impl HandlerRegistration {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        !self.released && self.set.upgrade().is_some_and(|set| set.contains(self.id))
    }

    /// Remove the handler. Returns `false` if it was already gone.
    pub fn dispose(mut self) -> bool {
        self.release()
    }

    /// Keep the handler registered and give up the handle.
    pub fn detach(mut self) -> HandlerId {
        self.released = true;
        self.id
    }

    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        match self.set.upgrade() {
            Some(set) => set.deregister(self.id),
            None => false,
        }
    }
}

impl Drop for HandlerRegistration {
    fn drop(&mut self) {
        if self.release() {
            debug!(handler = %self.id, "Event handler removed");
        }
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
    /// Broadcast subscribers the event was queued for.
    pub subscribers: usize,
}

/// Fans events out to registered handlers and broadcast subscribers.
pub struct EventRouter<E: RoutedEvent> {
    handlers: Arc<HandlerSet<E>>,
    sender: broadcast::Sender<E>,
    events_dispatched: AtomicU64,
    handler_failures: AtomicU64,
    capacity: usize,
}

impl<E: RoutedEvent> EventRouter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a router whose subscriptions buffer `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            handlers: Arc::new(HandlerSet::new()),
            sender,
            events_dispatched: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a handler for every event.
    pub fn add_handler<H>(&self, handler: H) -> HandlerRegistration
    where
        H: EventHandler<E> + 'static,
    {
        self.add_filtered_handler(EventFilter::all(), handler)
    }

    /// Register a closure for every event.
    pub fn add_handler_fn<F>(&self, handler: F) -> HandlerRegistration
    where
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.add_handler(handler)
    }

    /// Register a handler for events passing `filter`.
    pub fn add_filtered_handler<H>(&self, filter: EventFilter, handler: H) -> HandlerRegistration
    where
        H: EventHandler<E> + 'static,
    {
        let id = HandlerId(self.handlers.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.entries.insert(
            id,
            Registered {
                filter,
                handler: Arc::new(handler),
            },
        );
        debug!(handler = %id, "Event handler registered");

        let set: Arc<dyn Deregister> = self.handlers.clone();
        HandlerRegistration {
            id,
            set: Arc::downgrade(&set),
            released: false,
        }
    }

    /// Remove a handler by id. Returns `false` if it was not registered.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.handlers.entries.remove(&id).is_some()
    }

    /// Remove every handler.
    pub fn clear_handlers(&self) {
        self.handlers.entries.clear();
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.entries.len()
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription<E> {
        debug!(kinds = ?filter.kinds, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream<E> {
        EventStream::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Deliver an event to every matching handler, then to subscribers.
    ///
    /// Handler failures and panics are logged and counted in the report.
    pub fn dispatch(&self, event: E) -> DispatchReport {
        let kind = event.kind();
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);

        let mut snapshot: Vec<(HandlerId, Arc<dyn EventHandler<E>>)> = self
            .handlers
            .entries
            .iter()
            .filter(|entry| entry.filter.accepts(kind))
            .map(|entry| (*entry.key(), entry.handler.clone()))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        let mut report = DispatchReport::default();
        for (id, handler) in snapshot {
            report.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| handler.on_event(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(handler = %id, event_type = %kind, error = %e, "Event handler failed");
                }
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        handler = %id,
                        event_type = %kind,
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        self.handler_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);

        report.subscribers = self.sender.send(event).unwrap_or(0);

        debug!(
            event_type = %kind,
            handlers = report.invoked,
            failed = report.failed,
            subscribers = report.subscribers,
            "Event dispatched"
        );
        report
    }

    /// Total events dispatched.
    #[must_use]
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched.load(Ordering::Relaxed)
    }

    /// Total handler invocations that failed or panicked.
    #[must_use]
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }
}

impl<E: RoutedEvent> Default for EventRouter<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
