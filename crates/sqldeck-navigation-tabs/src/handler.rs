//! Tab handlers and their capabilities

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqldeck_core::ConnectionKey;
use std::sync::Arc;

use crate::{PersistedTab, Tab, TabRef};

/// Lifecycle hooks of a tab kind
#[async_trait]
pub trait TabLifecycle<S: Send + Sync + 'static>: Send + Sync {
    /// Rebuild a tab from its persisted form. `None` drops the tab.
    async fn on_restore(&self, tab: PersistedTab) -> Option<Tab<S>>;

    /// Final say before a tab is unloaded or closed
    async fn can_close(&self, _tab: &TabRef<S>) -> bool {
        true
    }

    /// Release transient resources; the tab may be shown again later
    async fn on_unload(&self, _tab: &TabRef<S>) {}

    /// The tab is gone for good
    async fn on_close(&self, _tab: &TabRef<S>) {}
}

pub type TabGetter<S, T> = Box<dyn Fn(&Tab<S>) -> Option<T> + Send + Sync>;

pub type TabSetter<S, A> = Box<dyn Fn(TabRef<S>, A) -> BoxFuture<'static, bool> + Send + Sync>;

/// Optional capabilities a handler exposes to the rest of the console.
///
/// Populated once at registration; callers check presence before use.
pub struct TabCapabilities<S> {
    pub get_connection_id: Option<TabGetter<S, ConnectionKey>>,
    pub set_connection_id: Option<TabSetter<S, ConnectionKey>>,
    pub get_catalog_id: Option<TabGetter<S, String>>,
    pub set_catalog_id: Option<TabSetter<S, String>>,
    pub get_schema_id: Option<TabGetter<S, String>>,
    pub set_schema_id: Option<TabSetter<S, String>>,
}

impl<S> Default for TabCapabilities<S> {
    fn default() -> Self {
        Self {
            get_connection_id: None,
            set_connection_id: None,
            get_catalog_id: None,
            set_catalog_id: None,
            get_schema_id: None,
            set_schema_id: None,
        }
    }
}

/// A registered tab kind
pub struct TabHandler<S: Send + Sync + 'static> {
    pub key: String,
    pub lifecycle: Arc<dyn TabLifecycle<S>>,
    pub capabilities: TabCapabilities<S>,
}

impl<S: Send + Sync + 'static> TabHandler<S> {
    pub fn new(key: impl Into<String>, lifecycle: Arc<dyn TabLifecycle<S>>) -> Self {
        Self {
            key: key.into(),
            lifecycle,
            capabilities: TabCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: TabCapabilities<S>) -> Self {
        self.capabilities = capabilities;
        self
    }
}
