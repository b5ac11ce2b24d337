//! Common test utilities and fakes

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sqldeck_connection::{
    ConnectionExecutionContextResource, ConnectionExecutionContextService,
    ConnectionInfoResource, ConnectionsManagerService, ExecutionContextApi,
    LocalExecutionContextApi, MemoryConnectionSource,
};
use sqldeck_core::{
    ConnectionInfo, ConnectionKey, DeckError, ExecutionContextInfo, NotificationService,
    ResourceKey, Result,
};
use sqldeck_navigation_tabs::{NavigationTabsService, PersistedTab};
use sqldeck_sql_editor::{
    FileDataSourceProvider, MemoryDataSourceProvider, SqlDataSourceService, SqlEditorService,
    SqlEditorTabState, SqlResultTabsService,
};
use sqldeck_sql_editor_tabs::{
    SQL_EDITOR_TAB_HANDLER_KEY, SqlEditorTabDependencies, SqlEditorTabRef, SqlEditorTabService,
};
use std::sync::Arc;
use tempfile::TempDir;

pub fn main_connection() -> ConnectionKey {
    ConnectionKey::new("p1", "c1")
}

pub fn reporting_connection() -> ConnectionKey {
    ConnectionKey::new("p1", "c2")
}

pub fn other_project_connection() -> ConnectionKey {
    ConnectionKey::new("p2", "c1")
}

fn known_connections() -> Vec<ConnectionInfo> {
    vec![
        ConnectionInfo::new("p1", "c1", "Main", "postgres"),
        ConnectionInfo::new("p1", "c2", "Reporting", "postgres"),
        ConnectionInfo::new("p2", "c1", "Analytics", "mysql"),
    ]
}

/// Execution-context API whose catalog/schema updates always fail
#[derive(Default)]
pub struct FailingUpdateApi {
    inner: LocalExecutionContextApi,
    pub update_calls: Mutex<usize>,
}

#[async_trait]
impl ExecutionContextApi for FailingUpdateApi {
    async fn create(
        &self,
        connection: &ConnectionKey,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        self.inner
            .create(connection, default_catalog, default_schema)
            .await
    }

    async fn update(
        &self,
        _context: &ExecutionContextInfo,
        _default_catalog: Option<&str>,
        _default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        *self.update_calls.lock() += 1;
        Err(DeckError::ExecutionContext("server rejected the change".into()))
    }

    async fn destroy(&self, context: &ExecutionContextInfo) -> Result<()> {
        self.inner.destroy(context).await
    }
}

/// Every service an SQL editor tab talks to, wired as the app does
pub struct Harness {
    pub tabs: Arc<NavigationTabsService<SqlEditorTabState>>,
    pub notifications: Arc<NotificationService>,
    pub data_sources: Arc<SqlDataSourceService>,
    pub result_tabs: Arc<SqlResultTabsService>,
    pub connections: Arc<ConnectionInfoResource>,
    pub contexts: Arc<ConnectionExecutionContextResource>,
    pub manager: Arc<ConnectionsManagerService>,
    pub service: Arc<SqlEditorTabService>,
    pub script_dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_api(Arc::new(LocalExecutionContextApi)).await
    }

    pub async fn with_api(api: Arc<dyn ExecutionContextApi>) -> Self {
        let script_dir = TempDir::new().unwrap();

        let tabs = Arc::new(NavigationTabsService::new());
        let notifications = Arc::new(NotificationService::new());

        let data_sources = Arc::new(SqlDataSourceService::new());
        data_sources.register_provider(Arc::new(MemoryDataSourceProvider));
        data_sources.register_provider(Arc::new(FileDataSourceProvider::new(script_dir.path())));

        let connections = Arc::new(ConnectionInfoResource::new(Arc::new(
            MemoryConnectionSource::new(known_connections()),
        )));
        connections.load(ResourceKey::All).await.unwrap();

        let contexts = Arc::new(ConnectionExecutionContextResource::new(api));
        let context_service = Arc::new(ConnectionExecutionContextService::new(contexts.clone()));
        let manager = Arc::new(ConnectionsManagerService::new(
            connections.clone(),
            contexts.clone(),
        ));
        let editor = Arc::new(SqlEditorService::new(
            data_sources.clone(),
            context_service.clone(),
            connections.clone(),
            notifications.clone(),
        ));
        let result_tabs = Arc::new(SqlResultTabsService::new());

        let service = SqlEditorTabService::new(SqlEditorTabDependencies {
            tabs: tabs.clone(),
            notifications: notifications.clone(),
            editor,
            result_tabs: result_tabs.clone(),
            contexts: context_service,
            connections: connections.clone(),
            data_sources: data_sources.clone(),
            manager: manager.clone(),
        });
        service.register();

        Self {
            tabs,
            notifications,
            data_sources,
            result_tabs,
            connections,
            contexts,
            manager,
            service,
            script_dir,
        }
    }

    /// Create and open an in-memory editor
    pub fn open_editor(&self, editor_id: &str) -> SqlEditorTabRef {
        self.open_editor_with(editor_id, MemoryDataSourceProvider::KEY)
    }

    pub fn open_editor_with(&self, editor_id: &str, datasource_key: &str) -> SqlEditorTabRef {
        let options = self
            .service
            .create_new_editor(editor_id, datasource_key, None, None, None)
            .expect("provider should be registered");
        self.tabs
            .open_tab(options)
            .expect("SQL editor handler should be registered")
    }

    /// Open an editor and bind it to a fresh context on `connection`
    pub async fn open_bound_editor(
        &self,
        editor_id: &str,
        connection: &ConnectionKey,
    ) -> SqlEditorTabRef {
        let tab = self.open_editor(editor_id);
        assert!(
            self.service
                .set_connection_id(&tab, connection, None, None)
                .await,
            "binding should succeed"
        );
        tab
    }

    pub fn execution_context(&self, tab: &SqlEditorTabRef) -> Option<ExecutionContextInfo> {
        let editor_id = tab.read().handler_state.editor_id.clone();
        self.data_sources.get(&editor_id)?.execution_context()
    }

    pub fn open_orders(&self) -> Vec<u32> {
        let mut orders: Vec<u32> = self
            .service
            .sql_editor_tabs()
            .iter()
            .map(|tab| tab.read().handler_state.order)
            .collect();
        orders.sort_unstable();
        orders
    }
}

pub fn order_of(tab: &SqlEditorTabRef) -> u32 {
    tab.read().handler_state.order
}

pub fn project_of(tab: &SqlEditorTabRef) -> Option<String> {
    tab.read().project_id.clone()
}

pub fn tab_id_of(tab: &SqlEditorTabRef) -> String {
    tab.read().id.clone()
}

/// Persisted handler state as written by a previous session
pub fn persisted_state(editor_id: &str) -> Value {
    json!({
        "editorId": editor_id,
        "order": 1,
        "datasourceKey": MemoryDataSourceProvider::KEY,
        "currentTabId": "result-1",
        "source": "navigator",
        "modeState": [],
        "tabs": [{ "id": "result-1", "order": 0 }],
        "executionPlanTabs": [{ "tabId": "plan-1", "query": "select 1" }],
        "resultGroups": [{ "groupId": "group-1", "query": "select 1", "order": 0 }],
        "resultTabs": [{ "tabId": "result-1", "groupId": "group-1", "indexInResultSet": 0 }],
        "statisticsTabs": [{ "tabId": "stats-1", "order": 0 }]
    })
}

pub fn persisted_tab(id: &str, handler_state: Value) -> PersistedTab {
    PersistedTab {
        id: id.to_string(),
        handler_id: SQL_EDITOR_TAB_HANDLER_KEY.to_string(),
        project_id: Some("p1".to_string()),
        handler_state,
    }
}
