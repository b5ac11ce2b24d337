//! Serial event executor with interruption
//!
//! `EventExecutor` is a small publish/subscribe primitive: handlers are
//! awaited one after another in registration order, and any handler may
//! interrupt the run through the shared [`EventContext`]. Once interrupted,
//! remaining handlers are skipped and the caller sees the interruption on the
//! returned context.

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Boxed event handler
pub type EventHandler<T> = Arc<dyn Fn(T, EventContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Identifier returned by [`EventExecutor::add_handler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Shared state of a single execution
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    interrupted: Arc<AtomicBool>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the execution after the current handler returns
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Serial publish/subscribe with veto
pub struct EventExecutor<T> {
    handlers: RwLock<Vec<(HandlerId, EventHandler<T>)>>,
    next_id: AtomicU64,
}

impl<T> EventExecutor<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler, returning its id for later removal
    pub fn add_handler<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(T, EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: EventHandler<T> = Arc::new(move |data, context| handler(data, context).boxed());
        self.handlers.write().push((id, handler));
        id
    }

    pub fn remove_handler(&self, id: HandlerId) {
        self.handlers.write().retain(|(handler_id, _)| *handler_id != id);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Run every handler in order, stopping at the first interruption
    pub async fn execute(&self, data: T) -> EventContext {
        let context = EventContext::new();
        self.execute_with(data, context.clone()).await;
        context
    }

    /// Run handlers against an existing context.
    ///
    /// Lets a caller chain several executors under one veto.
    pub async fn execute_with(&self, data: T, context: EventContext) {
        // Snapshot so handlers may (un)register while the run is in flight
        let handlers: Vec<EventHandler<T>> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            if context.is_interrupted() {
                break;
            }
            handler(data.clone(), context.clone()).await;
        }
    }
}

impl<T> Default for EventExecutor<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous handler
pub type SyncEventHandler<T> = Arc<dyn Fn(&T, &EventContext) + Send + Sync>;

/// Synchronous counterpart of [`EventExecutor`] for notifications fired
/// from non-async code (e.g. a script edit).
pub struct SyncEventExecutor<T> {
    handlers: RwLock<Vec<(HandlerId, SyncEventHandler<T>)>>,
    next_id: AtomicU64,
}

impl<T> SyncEventExecutor<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&T, &EventContext) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    pub fn remove_handler(&self, id: HandlerId) {
        self.handlers.write().retain(|(handler_id, _)| *handler_id != id);
    }

    pub fn execute(&self, data: &T) -> EventContext {
        let context = EventContext::new();
        let handlers: Vec<SyncEventHandler<T>> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            if context.is_interrupted() {
                break;
            }
            handler(data, &context);
        }

        context
    }
}

impl<T> Default for SyncEventExecutor<T> {
    fn default() -> Self {
        Self::new()
    }
}
