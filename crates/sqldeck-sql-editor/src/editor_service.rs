//! Editor-level operations shared by SQL editor front-ends

use sqldeck_connection::{ConnectionExecutionContextService, ConnectionInfoResource};
use sqldeck_core::{
    ConnectionKey, DeckError, ExecutionContextInfo, NotificationService, ResourceKey,
};
use std::sync::Arc;

use crate::{SqlDataSourceService, SqlEditorTabState};

pub struct SqlEditorService {
    data_sources: Arc<SqlDataSourceService>,
    contexts: Arc<ConnectionExecutionContextService>,
    connections: Arc<ConnectionInfoResource>,
    notifications: Arc<NotificationService>,
}

impl SqlEditorService {
    pub fn new(
        data_sources: Arc<SqlDataSourceService>,
        contexts: Arc<ConnectionExecutionContextService>,
        connections: Arc<ConnectionInfoResource>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            data_sources,
            contexts,
            connections,
            notifications,
        }
    }

    /// Initial state of a new editor tab
    pub fn get_state(
        &self,
        editor_id: impl Into<String>,
        datasource_key: impl Into<String>,
        order: u32,
        source: Option<String>,
    ) -> SqlEditorTabState {
        SqlEditorTabState::new(editor_id, datasource_key, order, source)
    }

    /// Bind the editor to a new execution context on `connection`.
    ///
    /// The previous context is destroyed once the new one is in place.
    /// Failures are reported as a notification and leave the binding as is.
    #[tracing::instrument(skip(self, state), fields(editor_id = %state.editor_id, connection = %connection))]
    pub async fn set_connection(
        &self,
        state: &SqlEditorTabState,
        connection: &ConnectionKey,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> bool {
        let Some(data_source) = self.data_sources.get(&state.editor_id) else {
            tracing::warn!("no data source for editor");
            return false;
        };

        if let Err(e) = self
            .connections
            .load(ResourceKey::One(connection.clone()))
            .await
        {
            self.notifications
                .log_exception(&e, "Failed to change SQL-editor connection");
            return false;
        }

        if !self.connections.has(connection) {
            let e = DeckError::NotFound(format!("Connection {connection}"));
            self.notifications
                .log_exception(&e, "Failed to change SQL-editor connection");
            return false;
        }

        let context = match self.contexts.create(connection, catalog, schema).await {
            Ok(context) => context,
            Err(e) => {
                self.notifications
                    .log_exception(&e, "Failed to change SQL-editor connection");
                return false;
            }
        };

        let previous = data_source.execution_context();
        data_source.set_execution_context(context.context());

        if let Some(previous) = previous {
            self.destroy_context(&previous).await;
        }

        true
    }

    /// Destroy a live execution context, best effort
    #[tracing::instrument(skip(self, context), fields(context_id = %context.id))]
    pub async fn destroy_context(&self, context: &ExecutionContextInfo) {
        let Some(handle) = self.contexts.get(&context.id) else {
            return;
        };

        if let Err(e) = handle.destroy().await {
            tracing::warn!(error = %e, "failed to destroy execution context");
        }
    }
}
