//! Bridges the tab host to [`SqlEditorTabService`]

use async_trait::async_trait;
use futures::FutureExt;
use sqldeck_core::ConnectionKey;
use sqldeck_navigation_tabs::{PersistedTab, Tab, TabCapabilities, TabLifecycle, TabRef};
use sqldeck_sql_editor::SqlEditorTabState;
use std::sync::Weak;

use crate::SqlEditorTabService;

/// Lifecycle hooks registered with the tab host; holds the service weakly
pub(crate) struct SqlEditorTabLifecycle {
    pub(crate) service: Weak<SqlEditorTabService>,
}

#[async_trait]
impl TabLifecycle<SqlEditorTabState> for SqlEditorTabLifecycle {
    async fn on_restore(&self, tab: PersistedTab) -> Option<Tab<SqlEditorTabState>> {
        let service = self.service.upgrade()?;
        service.handle_tab_restore(tab).await
    }

    async fn can_close(&self, tab: &TabRef<SqlEditorTabState>) -> bool {
        match self.service.upgrade() {
            Some(service) => service.handle_can_tab_close(tab).await,
            None => true,
        }
    }

    async fn on_unload(&self, tab: &TabRef<SqlEditorTabState>) {
        if let Some(service) = self.service.upgrade() {
            service.handle_tab_unload(tab).await;
        }
    }

    async fn on_close(&self, tab: &TabRef<SqlEditorTabState>) {
        if let Some(service) = self.service.upgrade() {
            service.handle_tab_close(tab).await;
        }
    }
}

pub(crate) fn capabilities(
    service: &Weak<SqlEditorTabService>,
) -> TabCapabilities<SqlEditorTabState> {
    TabCapabilities {
        get_connection_id: Some(Box::new({
            let service = service.clone();
            move |tab: &Tab<SqlEditorTabState>| service.upgrade()?.get_connection_id(tab)
        })),
        set_connection_id: Some(Box::new({
            let service = service.clone();
            move |tab: TabRef<SqlEditorTabState>, key: ConnectionKey| {
                let service = service.clone();
                async move {
                    match service.upgrade() {
                        Some(service) => service.set_connection_id(&tab, &key, None, None).await,
                        None => false,
                    }
                }
                .boxed()
            }
        })),
        get_catalog_id: Some(Box::new({
            let service = service.clone();
            move |tab: &Tab<SqlEditorTabState>| service.upgrade()?.get_object_catalog_id(tab)
        })),
        set_catalog_id: Some(Box::new({
            let service = service.clone();
            move |tab: TabRef<SqlEditorTabState>, catalog: String| {
                let service = service.clone();
                async move {
                    match service.upgrade() {
                        Some(service) => service.set_object_catalog_id(&tab, &catalog).await,
                        None => false,
                    }
                }
                .boxed()
            }
        })),
        get_schema_id: Some(Box::new({
            let service = service.clone();
            move |tab: &Tab<SqlEditorTabState>| service.upgrade()?.get_object_schema_id(tab)
        })),
        set_schema_id: Some(Box::new({
            let service = service.clone();
            move |tab: TabRef<SqlEditorTabState>, schema: String| {
                let service = service.clone();
                async move {
                    match service.upgrade() {
                        Some(service) => service.set_object_schema_id(&tab, &schema).await,
                        None => false,
                    }
                }
                .boxed()
            }
        })),
    }
}
