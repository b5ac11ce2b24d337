//! SQLDeck application shell
//!
//! Builds every service once and wires them together. Binaries and tests
//! go through [`AppState`].

pub mod logging;
pub mod settings;

use anyhow::{Context, Result};
use sqldeck_connection::{
    ConnectionExecutionContextResource, ConnectionExecutionContextService,
    ConnectionInfoResource, ConnectionsManagerService, JsonConnectionStorage,
    LocalExecutionContextApi,
};
use sqldeck_core::{ConnectionKey, NotificationService, ResourceKey};
use sqldeck_navigation_tabs::NavigationTabsService;
use sqldeck_sql_editor::{
    FileDataSourceProvider, MemoryDataSourceProvider, SqlDataSourceService, SqlEditorService,
    SqlEditorTabState, SqlResultTabsService,
};
use sqldeck_sql_editor_tabs::{SqlEditorTabDependencies, SqlEditorTabRef, SqlEditorTabService};
use std::sync::Arc;
use uuid::Uuid;

pub use settings::DeckSettings;

/// One line of the open-editor listing
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSummary {
    pub tab_id: String,
    pub title: String,
    pub connection: Option<ConnectionKey>,
    pub current: bool,
}

/// Application-wide services
pub struct AppState {
    pub settings: DeckSettings,
    pub notifications: Arc<NotificationService>,
    pub connections: Arc<ConnectionInfoResource>,
    pub contexts: Arc<ConnectionExecutionContextService>,
    pub manager: Arc<ConnectionsManagerService>,
    pub data_sources: Arc<SqlDataSourceService>,
    pub tabs: Arc<NavigationTabsService<SqlEditorTabState>>,
    pub sql_editor_tabs: Arc<SqlEditorTabService>,
}

impl AppState {
    pub fn new(settings: DeckSettings) -> Result<Self> {
        let notifications = Arc::new(NotificationService::new());

        let connections = Arc::new(ConnectionInfoResource::new(Arc::new(
            JsonConnectionStorage::new(settings.connections_file()?),
        )));
        let context_resource = Arc::new(ConnectionExecutionContextResource::new(Arc::new(
            LocalExecutionContextApi,
        )));
        let contexts = Arc::new(ConnectionExecutionContextService::new(
            context_resource.clone(),
        ));
        let manager = Arc::new(ConnectionsManagerService::new(
            connections.clone(),
            context_resource,
        ));

        let data_sources =
            Arc::new(SqlDataSourceService::new().with_storage_path(settings.data_sources_file()?));
        data_sources.register_provider(Arc::new(MemoryDataSourceProvider));
        data_sources.register_provider(Arc::new(FileDataSourceProvider::new(
            settings.scripts_dir()?,
        )));

        let editor = Arc::new(SqlEditorService::new(
            data_sources.clone(),
            contexts.clone(),
            connections.clone(),
            notifications.clone(),
        ));
        let tabs = Arc::new(NavigationTabsService::with_storage_path(
            settings.session_file()?,
        ));

        let sql_editor_tabs = SqlEditorTabService::new(SqlEditorTabDependencies {
            tabs: tabs.clone(),
            notifications: notifications.clone(),
            editor,
            result_tabs: Arc::new(SqlResultTabsService::new()),
            contexts: contexts.clone(),
            connections: connections.clone(),
            data_sources: data_sources.clone(),
            manager: manager.clone(),
        });
        sql_editor_tabs.register();

        tracing::debug!("application services constructed");

        Ok(Self {
            settings,
            notifications,
            connections,
            contexts,
            manager,
            data_sources,
            tabs,
            sql_editor_tabs,
        })
    }

    /// Load connections and, if enabled, the previous tab session.
    ///
    /// Returns how many editor tabs were restored.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self) -> Result<usize> {
        if let Err(e) = self.connections.load(ResourceKey::All).await {
            self.notifications
                .log_exception(&e, "Failed to load connections");
        }

        if !self.settings.restore_session {
            tracing::info!("session restore disabled");
            return Ok(0);
        }

        self.data_sources
            .load_from_storage()
            .await
            .context("Failed to load data source snapshots")?;
        let restored = self
            .tabs
            .load_from_storage()
            .await
            .context("Failed to restore tab session")?;

        Ok(restored)
    }

    /// Open a new editor with the configured data source provider
    pub fn open_new_editor(&self) -> Result<SqlEditorTabRef> {
        let editor_id = Uuid::new_v4().to_string();
        let options = self
            .sql_editor_tabs
            .create_new_editor(
                &editor_id,
                &self.settings.datasource_key,
                None,
                None,
                None,
            )
            .with_context(|| {
                format!(
                    "No data source provider for '{}'",
                    self.settings.datasource_key
                )
            })?;

        let tab = self.tabs.open_tab(options)?;
        tracing::info!(%editor_id, "new SQL editor opened");
        Ok(tab)
    }

    pub fn editor_summaries(&self) -> Vec<EditorSummary> {
        let current = self
            .tabs
            .current_tab()
            .map(|tab| tab.read().id.clone());

        self.sql_editor_tabs
            .sql_editor_tabs()
            .iter()
            .map(|tab| {
                let tab = tab.read();
                let title = self
                    .data_sources
                    .get(&tab.handler_state.editor_id)
                    .and_then(|data_source| data_source.name())
                    .unwrap_or_else(|| {
                        format!("{} {}", self.settings.new_editor_name, tab.handler_state.order)
                    });

                EditorSummary {
                    tab_id: tab.id.clone(),
                    title,
                    connection: self.sql_editor_tabs.get_connection_id(&tab),
                    current: current.as_deref() == Some(tab.id.as_str()),
                }
            })
            .collect()
    }

    /// Persist the tab session and data source snapshots
    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> Result<()> {
        self.tabs
            .save_to_storage()
            .await
            .context("Failed to save tab session")?;
        self.data_sources
            .save_to_storage()
            .await
            .context("Failed to save data source snapshots")?;
        Ok(())
    }
}
