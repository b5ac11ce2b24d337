//! Tab container host

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use sqldeck_core::ConnectionKey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{TabsError, TabsResult};
use crate::{PersistedSession, PersistedTab, Tab, TabHandler, TabOptions, TabRef};

/// Owns open tabs and drives their lifecycle through registered handlers
pub struct NavigationTabsService<S: Send + Sync + 'static> {
    handlers: RwLock<HashMap<String, Arc<TabHandler<S>>>>,

    /// Open tabs in opening order
    tabs: RwLock<IndexMap<String, TabRef<S>>>,

    current_tab_id: RwLock<Option<String>>,

    /// Session file, `None` keeps the session in memory only
    storage_path: Option<PathBuf>,
}

impl<S: Send + Sync + 'static> NavigationTabsService<S> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            tabs: RwLock::new(IndexMap::new()),
            current_tab_id: RwLock::new(None),
            storage_path: None,
        }
    }

    pub fn with_storage_path(path: PathBuf) -> Self {
        Self {
            storage_path: Some(path),
            ..Self::new()
        }
    }

    pub fn register_tab_handler(&self, handler: TabHandler<S>) -> Arc<TabHandler<S>> {
        let handler = Arc::new(handler);
        tracing::debug!(handler = %handler.key, "tab handler registered");
        self.handlers
            .write()
            .insert(handler.key.clone(), handler.clone());
        handler
    }

    pub fn handler(&self, key: &str) -> Option<Arc<TabHandler<S>>> {
        self.handlers.read().get(key).cloned()
    }

    /// Open (or re-select) a tab and make it current
    pub fn open_tab(&self, options: TabOptions<S>) -> TabsResult<TabRef<S>> {
        if self.handler(&options.handler_id).is_none() {
            return Err(TabsError::HandlerNotFound(options.handler_id));
        }

        let id = options.id.clone();
        let tab = {
            let mut tabs = self.tabs.write();
            tabs.entry(id.clone())
                .or_insert_with(|| Arc::new(RwLock::new(Tab::from_options(options))))
                .clone()
        };

        *self.current_tab_id.write() = Some(id.clone());
        tracing::debug!(tab_id = %id, "tab opened");
        Ok(tab)
    }

    pub fn select_tab(&self, id: &str) -> bool {
        if !self.tabs.read().contains_key(id) {
            return false;
        }
        *self.current_tab_id.write() = Some(id.to_string());
        true
    }

    pub fn current_tab(&self) -> Option<TabRef<S>> {
        let current = self.current_tab_id.read().clone()?;
        self.get_tab(&current)
    }

    pub fn get_tab(&self, id: &str) -> Option<TabRef<S>> {
        self.tabs.read().get(id).cloned()
    }

    pub fn tabs(&self) -> Vec<TabRef<S>> {
        self.tabs.read().values().cloned().collect()
    }

    /// Snapshot of the tabs matching `predicate`, in opening order
    pub fn find_tabs<P>(&self, predicate: P) -> Vec<TabRef<S>>
    where
        P: Fn(&Tab<S>) -> bool,
    {
        self.tabs
            .read()
            .values()
            .filter(|tab| predicate(&*tab.read()))
            .cloned()
            .collect()
    }

    /// Close a tab: can-close gate, then unload, then close.
    ///
    /// Returns `Ok(false)` when the handler refused; the tab stays open.
    #[tracing::instrument(skip(self))]
    pub async fn close_tab(&self, id: &str) -> TabsResult<bool> {
        let (tab, handler) = self.tab_with_handler(id)?;

        if !handler.lifecycle.can_close(&tab).await {
            tracing::debug!("tab close vetoed");
            return Ok(false);
        }

        handler.lifecycle.on_unload(&tab).await;
        handler.lifecycle.on_close(&tab).await;

        self.tabs.write().shift_remove(id);
        let mut current = self.current_tab_id.write();
        if current.as_deref() == Some(id) {
            *current = self.tabs.read().keys().last().cloned();
        }

        tracing::debug!("tab closed");
        Ok(true)
    }

    /// Unload a tab's transient resources without closing it
    #[tracing::instrument(skip(self))]
    pub async fn unload_tab(&self, id: &str) -> TabsResult<bool> {
        let (tab, handler) = self.tab_with_handler(id)?;

        if !handler.lifecycle.can_close(&tab).await {
            return Ok(false);
        }

        handler.lifecycle.on_unload(&tab).await;
        Ok(true)
    }

    /// Restore persisted tabs, one at a time. Returns how many survived.
    #[tracing::instrument(skip(self, session), fields(count = session.tabs.len()))]
    pub async fn restore(&self, session: PersistedSession) -> usize {
        let mut restored = 0;

        for persisted in session.tabs {
            let Some(handler) = self.handler(&persisted.handler_id) else {
                tracing::warn!(
                    tab_id = %persisted.id,
                    handler = %persisted.handler_id,
                    "dropping tab with unknown handler"
                );
                continue;
            };

            let id = persisted.id.clone();
            match handler.lifecycle.on_restore(persisted).await {
                Some(tab) => {
                    self.tabs
                        .write()
                        .insert(tab.id.clone(), Arc::new(RwLock::new(tab)));
                    restored += 1;
                }
                None => tracing::warn!(tab_id = %id, "tab restore rejected"),
            }
        }

        if let Some(current) = session.current_tab_id
            && self.tabs.read().contains_key(&current)
        {
            *self.current_tab_id.write() = Some(current);
        }

        tracing::info!(restored, "tab session restored");
        restored
    }

    pub fn get_connection_id(&self, id: &str) -> TabsResult<Option<ConnectionKey>> {
        let (tab, handler) = self.tab_with_handler(id)?;
        let getter = handler
            .capabilities
            .get_connection_id
            .as_ref()
            .ok_or_else(|| unsupported(&handler, "get_connection_id"))?;
        let tab = tab.read();
        Ok(getter(&*tab))
    }

    pub async fn set_connection_id(&self, id: &str, key: ConnectionKey) -> TabsResult<bool> {
        let (tab, handler) = self.tab_with_handler(id)?;
        let setter = handler
            .capabilities
            .set_connection_id
            .as_ref()
            .ok_or_else(|| unsupported(&handler, "set_connection_id"))?;
        Ok(setter(tab, key).await)
    }

    pub fn get_catalog_id(&self, id: &str) -> TabsResult<Option<String>> {
        let (tab, handler) = self.tab_with_handler(id)?;
        let getter = handler
            .capabilities
            .get_catalog_id
            .as_ref()
            .ok_or_else(|| unsupported(&handler, "get_catalog_id"))?;
        let tab = tab.read();
        Ok(getter(&*tab))
    }

    pub async fn set_catalog_id(&self, id: &str, catalog: String) -> TabsResult<bool> {
        let (tab, handler) = self.tab_with_handler(id)?;
        let setter = handler
            .capabilities
            .set_catalog_id
            .as_ref()
            .ok_or_else(|| unsupported(&handler, "set_catalog_id"))?;
        Ok(setter(tab, catalog).await)
    }

    pub fn get_schema_id(&self, id: &str) -> TabsResult<Option<String>> {
        let (tab, handler) = self.tab_with_handler(id)?;
        let getter = handler
            .capabilities
            .get_schema_id
            .as_ref()
            .ok_or_else(|| unsupported(&handler, "get_schema_id"))?;
        let tab = tab.read();
        Ok(getter(&*tab))
    }

    pub async fn set_schema_id(&self, id: &str, schema: String) -> TabsResult<bool> {
        let (tab, handler) = self.tab_with_handler(id)?;
        let setter = handler
            .capabilities
            .set_schema_id
            .as_ref()
            .ok_or_else(|| unsupported(&handler, "set_schema_id"))?;
        Ok(setter(tab, schema).await)
    }

    fn tab_with_handler(&self, id: &str) -> TabsResult<(TabRef<S>, Arc<TabHandler<S>>)> {
        let tab = self
            .get_tab(id)
            .ok_or_else(|| TabsError::TabNotFound(id.to_string()))?;
        let handler_id = tab.read().handler_id.clone();
        let handler = self
            .handler(&handler_id)
            .ok_or(TabsError::HandlerNotFound(handler_id))?;
        Ok((tab, handler))
    }
}

impl<S: Serialize + Send + Sync + 'static> NavigationTabsService<S> {
    /// Current session in its persisted form
    pub fn persisted(&self) -> TabsResult<PersistedSession> {
        let tabs = self
            .tabs()
            .iter()
            .map(|tab| {
                let tab = tab.read();
                Ok(PersistedTab {
                    id: tab.id.clone(),
                    handler_id: tab.handler_id.clone(),
                    project_id: tab.project_id.clone(),
                    handler_state: serde_json::to_value(&tab.handler_state)?,
                })
            })
            .collect::<TabsResult<Vec<_>>>()?;

        Ok(PersistedSession {
            tabs,
            current_tab_id: self.current_tab_id.read().clone(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn save_to_storage(&self) -> TabsResult<()> {
        let Some(path) = &self.storage_path else {
            tracing::debug!("no session storage path configured");
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let session = self.persisted()?;
        let content = serde_json::to_string_pretty(&session)?;
        tokio::fs::write(path, content).await?;

        tracing::info!(tabs = session.tabs.len(), path = ?path, "tab session saved");
        Ok(())
    }

    /// Restore the session file, if any. Returns how many tabs survived.
    #[tracing::instrument(skip(self))]
    pub async fn load_from_storage(&self) -> TabsResult<usize> {
        let Some(path) = &self.storage_path else {
            return Ok(0);
        };
        if !path.exists() {
            tracing::debug!(path = ?path, "no tab session file");
            return Ok(0);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let session: PersistedSession = serde_json::from_str(&content)?;
        Ok(self.restore(session).await)
    }
}

impl<S: Send + Sync + 'static> Default for NavigationTabsService<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported<S: Send + Sync + 'static>(
    handler: &TabHandler<S>,
    capability: &'static str,
) -> TabsError {
    TabsError::Unsupported {
        handler: handler.key.clone(),
        capability,
    }
}
