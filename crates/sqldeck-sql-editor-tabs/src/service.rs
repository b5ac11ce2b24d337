//! SQL editor tab service

use serde_json::Value;
use sqldeck_connection::{
    ConnectionExecutionContextResource, ConnectionExecutionContextService,
    ConnectionExecutorData, ConnectionExecutorState, ConnectionInfoResource,
    ConnectionsManagerService,
};
use sqldeck_core::{
    ConnectionKey, EventContext, EventExecutor, ExecutionContextInfo, NotificationService,
    ResourceKey,
};
use sqldeck_navigation_tabs::{
    NavigationTabsService, PersistedTab, Tab, TabHandler, TabOptions, TabRef,
};
use sqldeck_sql_editor::{
    CreateDataSourceOptions, SqlDataSource, SqlDataSourceService, SqlEditorService,
    SqlEditorTabState, SqlResultTabsService, validate_persisted_state,
};
use std::sync::Arc;

use crate::SQL_EDITOR_TAB_HANDLER_KEY;
use crate::lifecycle::{SqlEditorTabLifecycle, capabilities};

pub type SqlEditorTabRef = TabRef<SqlEditorTabState>;

/// Services the SQL editor tabs are wired to
#[derive(Clone)]
pub struct SqlEditorTabDependencies {
    pub tabs: Arc<NavigationTabsService<SqlEditorTabState>>,
    pub notifications: Arc<NotificationService>,
    pub editor: Arc<SqlEditorService>,
    pub result_tabs: Arc<SqlResultTabsService>,
    pub contexts: Arc<ConnectionExecutionContextService>,
    pub connections: Arc<ConnectionInfoResource>,
    pub data_sources: Arc<SqlDataSourceService>,
    pub manager: Arc<ConnectionsManagerService>,
}

/// SQL editor tab kind: creation, lifecycle and connection binding
pub struct SqlEditorTabService {
    tabs: Arc<NavigationTabsService<SqlEditorTabState>>,
    notifications: Arc<NotificationService>,
    editor: Arc<SqlEditorService>,
    result_tabs: Arc<SqlResultTabsService>,
    contexts: Arc<ConnectionExecutionContextService>,
    context_resource: Arc<ConnectionExecutionContextResource>,
    connections: Arc<ConnectionInfoResource>,
    data_sources: Arc<SqlDataSourceService>,
    manager: Arc<ConnectionsManagerService>,
    handler: Arc<TabHandler<SqlEditorTabState>>,

    /// Asked before an editor closes; interrupt to keep it open
    pub on_can_close: EventExecutor<SqlEditorTabRef>,
}

impl SqlEditorTabService {
    /// Create the service and register the SQL editor tab handler
    pub fn new(deps: SqlEditorTabDependencies) -> Arc<Self> {
        Arc::new_cyclic(|service| {
            let handler = deps.tabs.register_tab_handler(
                TabHandler::new(
                    SQL_EDITOR_TAB_HANDLER_KEY,
                    Arc::new(SqlEditorTabLifecycle {
                        service: service.clone(),
                    }),
                )
                .with_capabilities(capabilities(service)),
            );

            Self {
                context_resource: deps.contexts.resource(),
                tabs: deps.tabs,
                notifications: deps.notifications,
                editor: deps.editor,
                result_tabs: deps.result_tabs,
                contexts: deps.contexts,
                connections: deps.connections,
                data_sources: deps.data_sources,
                manager: deps.manager,
                handler,
                on_can_close: EventExecutor::new(),
            }
        })
    }

    /// Subscribe to connection and execution-context events
    pub fn register(self: &Arc<Self>) {
        let service = Arc::downgrade(self);
        self.manager.on_disconnect.add_handler(move |data, context| {
            let service = service.clone();
            async move {
                if let Some(service) = service.upgrade() {
                    service.handle_disconnect(data, context).await;
                }
            }
        });

        let service = Arc::downgrade(self);
        self.connections.on_item_delete.add_handler(move |key, _| {
            let service = service.clone();
            async move {
                if let Some(service) = service.upgrade() {
                    service.handle_connection_delete(&key);
                }
            }
        });

        let service = Arc::downgrade(self);
        self.context_resource.on_item_add.add_handler(move |_, _| {
            let service = service.clone();
            async move {
                if let Some(service) = service.upgrade() {
                    service.handle_execution_context_update();
                }
            }
        });

        let service = Arc::downgrade(self);
        self.context_resource.on_item_delete.add_handler(move |key, _| {
            let service = service.clone();
            async move {
                if let Some(service) = service.upgrade() {
                    service.handle_execution_context_delete(&key);
                }
            }
        });

        tracing::debug!("SQL editor tab handlers registered");
    }

    pub fn tab_handler(&self) -> &Arc<TabHandler<SqlEditorTabState>> {
        &self.handler
    }

    /// Open SQL editor tabs, in opening order
    pub fn sql_editor_tabs(&self) -> Vec<SqlEditorTabRef> {
        self.tabs.find_tabs(is_sql_editor_tab)
    }

    /// Build the options of a new editor tab.
    ///
    /// Returns `None` when no data source provider is registered for
    /// `datasource_key`.
    pub fn create_new_editor(
        &self,
        editor_id: &str,
        datasource_key: &str,
        name: Option<String>,
        source: Option<String>,
        script: Option<String>,
    ) -> Option<TabOptions<SqlEditorTabState>> {
        let order = self.free_editor_order();
        let handler_state = self
            .editor
            .get_state(editor_id, datasource_key, order, source);

        let data_source = match self.data_sources.create(
            &handler_state,
            CreateDataSourceOptions {
                name,
                script,
                execution_context: None,
            },
        ) {
            Ok(data_source) => data_source,
            Err(e) => {
                tracing::warn!(%editor_id, error = %e, "cannot create SQL editor");
                return None;
            }
        };

        Some(TabOptions {
            id: editor_id.to_string(),
            project_id: data_source
                .execution_context()
                .map(|context| context.project_id),
            handler_id: SQL_EDITOR_TAB_HANDLER_KEY.to_string(),
            handler_state,
        })
    }

    pub fn attach_to_project(&self, tab: &mut Tab<SqlEditorTabState>, project_id: Option<String>) {
        tab.project_id = project_id;
    }

    /// Unbind the editor from its execution context and project
    pub fn reset_connection_info(&self, tab: &mut Tab<SqlEditorTabState>) {
        if let Some(data_source) = self.data_sources.get(&tab.handler_state.editor_id) {
            data_source.set_execution_context(None);
        }
        self.attach_to_project(tab, None);
        tracing::debug!(tab_id = %tab.id, "SQL editor connection reset");
    }

    /// Bind the editor to a new context on `connection`
    pub async fn set_connection_id(
        &self,
        tab: &SqlEditorTabRef,
        connection: &ConnectionKey,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> bool {
        let state = tab.read().handler_state.clone();
        let changed = self
            .editor
            .set_connection(&state, connection, catalog, schema)
            .await;

        if changed {
            self.attach_to_project(&mut tab.write(), Some(connection.project_id.clone()));
        }
        changed
    }

    pub fn get_connection_id(&self, tab: &Tab<SqlEditorTabState>) -> Option<ConnectionKey> {
        self.data_sources
            .get(&tab.handler_state.editor_id)?
            .execution_context()
            .map(|context| context.connection_key())
    }

    /// Default catalog of the live context
    pub fn get_object_catalog_id(&self, tab: &Tab<SqlEditorTabState>) -> Option<String> {
        self.live_context(tab)?.default_catalog
    }

    /// Default schema of the live context
    pub fn get_object_schema_id(&self, tab: &Tab<SqlEditorTabState>) -> Option<String> {
        self.live_context(tab)?.default_schema
    }

    pub async fn set_object_catalog_id(&self, tab: &SqlEditorTabRef, catalog: &str) -> bool {
        let Some((data_source, context)) = self.bound_data_source(tab) else {
            return false;
        };

        self.update_context(
            data_source,
            &context,
            Some(catalog),
            context.default_schema.as_deref(),
            "Failed to change SQL-editor catalog",
        )
        .await
    }

    pub async fn set_object_schema_id(&self, tab: &SqlEditorTabRef, schema: &str) -> bool {
        let Some((data_source, context)) = self.bound_data_source(tab) else {
            return false;
        };

        self.update_context(
            data_source,
            &context,
            context.default_catalog.as_deref(),
            Some(schema),
            "Failed to change SQL-editor schema",
        )
        .await
    }

    async fn update_context(
        &self,
        data_source: Arc<dyn SqlDataSource>,
        context: &ExecutionContextInfo,
        catalog: Option<&str>,
        schema: Option<&str>,
        failure_title: &str,
    ) -> bool {
        let Some(live) = self.contexts.get(&context.id) else {
            return false;
        };

        match live.update(catalog, schema).await {
            Ok(updated) => {
                data_source.set_execution_context(Some(updated));
                true
            }
            Err(e) => {
                self.notifications.log_exception(&e, failure_title);
                false
            }
        }
    }

    fn live_context(&self, tab: &Tab<SqlEditorTabState>) -> Option<ExecutionContextInfo> {
        let context = self
            .data_sources
            .get(&tab.handler_state.editor_id)?
            .execution_context()?;
        self.context_resource.get(&context.id)
    }

    fn bound_data_source(
        &self,
        tab: &SqlEditorTabRef,
    ) -> Option<(Arc<dyn SqlDataSource>, ExecutionContextInfo)> {
        let editor_id = tab.read().handler_state.editor_id.clone();
        let data_source = self.data_sources.get(&editor_id)?;
        let context = data_source.execution_context()?;
        Some((data_source, context))
    }

    /// SQL editor tabs whose data source is bound to an execution context
    fn bound_tabs(&self) -> Vec<(SqlEditorTabRef, Arc<dyn SqlDataSource>, ExecutionContextInfo)> {
        self.sql_editor_tabs()
            .into_iter()
            .filter_map(|tab| {
                let (data_source, context) = self.bound_data_source(&tab)?;
                Some((tab, data_source, context))
            })
            .collect()
    }

    fn free_editor_order(&self) -> u32 {
        let orders = self
            .sql_editor_tabs()
            .iter()
            .map(|tab| tab.read().handler_state.order)
            .collect();
        find_minimal_free(orders, 1)
    }

    fn handle_connection_delete(&self, key: &ResourceKey<ConnectionKey>) {
        for (tab, _, context) in self.bound_tabs() {
            if self.connections.includes(key, &context.connection_key()) {
                self.reset_connection_info(&mut tab.write());
            }
        }
    }

    /// Refresh bound editors after a context was created or updated
    fn handle_execution_context_update(&self) {
        for (tab, data_source, context) in self.bound_tabs() {
            match self.context_resource.get(&context.id) {
                Some(live) => {
                    let project_id = live.project_id.clone();
                    data_source.set_execution_context(Some(live));
                    self.attach_to_project(&mut tab.write(), Some(project_id));
                }
                None => {
                    if !self.connections.has(&context.connection_key()) {
                        self.reset_connection_info(&mut tab.write());
                    }
                }
            }
        }
    }

    fn handle_execution_context_delete(&self, key: &ResourceKey<String>) {
        for (tab, _, context) in self.bound_tabs() {
            if key.includes(&context.id) && !self.connections.has(&context.connection_key()) {
                self.reset_connection_info(&mut tab.write());
            }
        }
    }

    /// Veto a disconnect while an affected editor refuses to close
    #[tracing::instrument(skip_all, fields(count = data.connections.len()))]
    async fn handle_disconnect(&self, data: ConnectionExecutorData, context: EventContext) {
        if data.state != ConnectionExecutorState::Before {
            return;
        }

        let connections = ResourceKey::List(data.connections);
        for (tab, _, execution_context) in self.bound_tabs() {
            if !self
                .connections
                .includes(&connections, &execution_context.connection_key())
            {
                continue;
            }

            if !self.handle_can_tab_close(&tab).await {
                tracing::info!("disconnect vetoed by SQL editor");
                context.interrupt();
                return;
            }
        }
    }

    pub(crate) async fn handle_can_tab_close(&self, tab: &SqlEditorTabRef) -> bool {
        let state = tab.read().handler_state.clone();

        if !self.result_tabs.can_close_result_tabs(&state).await {
            return false;
        }

        if self.on_can_close.execute(tab.clone()).await.is_interrupted() {
            return false;
        }

        self.data_sources.can_destroy(&state.editor_id).await
    }

    pub(crate) async fn handle_tab_unload(&self, tab: &SqlEditorTabRef) {
        let editor_id = tab.read().handler_state.editor_id.clone();

        if let Some(context) = self
            .data_sources
            .get(&editor_id)
            .and_then(|data_source| data_source.execution_context())
        {
            self.editor.destroy_context(&context).await;
        }

        self.data_sources.unload(&editor_id).await;
        self.result_tabs
            .remove_result_tabs(&mut tab.write().handler_state);
    }

    pub(crate) async fn handle_tab_close(&self, tab: &SqlEditorTabRef) {
        let editor_id = tab.read().handler_state.editor_id.clone();
        self.data_sources.destroy(&editor_id).await;
    }

    /// Rebuild a persisted editor tab, or drop it.
    ///
    /// The persisted state is shape-checked first; an invalid tab takes its
    /// data source with it. Result sub-tabs never survive a restore.
    #[tracing::instrument(skip_all, fields(tab_id = %persisted.id))]
    pub(crate) async fn handle_tab_restore(
        &self,
        persisted: PersistedTab,
    ) -> Option<Tab<SqlEditorTabState>> {
        let PersistedTab {
            id,
            handler_id,
            project_id,
            mut handler_state,
        } = persisted;

        if let Err(e) = validate_persisted_state(&handler_state) {
            tracing::warn!(error = %e, "dropping SQL editor tab with invalid state");
            self.destroy_persisted_data_source(&handler_state).await;
            return None;
        }

        // Sub-tab elements are never deserialized; only their array shape was checked
        for field in [
            "tabs",
            "executionPlanTabs",
            "resultGroups",
            "resultTabs",
            "statisticsTabs",
        ] {
            handler_state[field] = Value::Array(Vec::new());
        }

        let state: SqlEditorTabState = match serde_json::from_value(handler_state.clone()) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "dropping SQL editor tab with unreadable state");
                self.destroy_persisted_data_source(&handler_state).await;
                return None;
            }
        };

        let mut tab = Tab {
            id,
            handler_id,
            project_id,
            handler_state: state,
        };

        let data_source = match self
            .data_sources
            .create(&tab.handler_state, CreateDataSourceOptions::default())
        {
            Ok(data_source) => data_source,
            Err(e) => {
                tracing::warn!(error = %e, "dropping SQL editor tab without data source");
                return None;
            }
        };

        if !data_source.is_loaded()
            && let Err(e) = data_source.load().await
        {
            tracing::warn!(error = %e, "failed to load SQL editor script");
        }

        if let Some(context) = data_source.execution_context() {
            if let Err(e) = self.connections.load(ResourceKey::All).await {
                tracing::warn!(error = %e, "failed to load connections");
            }

            if !self.connections.has(&context.connection_key()) {
                self.reset_connection_info(&mut tab);
            }
        }

        tab.handler_state.clear_results();
        Some(tab)
    }

    async fn destroy_persisted_data_source(&self, handler_state: &Value) {
        if let Some(editor_id) = handler_state.get("editorId").and_then(Value::as_str) {
            self.data_sources.destroy(editor_id).await;
        }
    }
}

fn is_sql_editor_tab(tab: &Tab<SqlEditorTabState>) -> bool {
    tab.handler_id == SQL_EDITOR_TAB_HANDLER_KEY
}

/// Lowest value `>= base` missing from `values`
fn find_minimal_free(mut values: Vec<u32>, base: u32) -> u32 {
    values.sort_unstable();
    values.into_iter().fold(base, |free, value| {
        if value == free { free + 1 } else { free }
    })
}
