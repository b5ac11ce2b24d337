//! Live execution contexts
//!
//! An execution context is a server-side session bound to a connection with
//! a default catalog/schema. The resource keeps the latest snapshot of each
//! context and publishes add/update and delete events.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use sqldeck_core::{
    ConnectionKey, DeckError, EventExecutor, ExecutionContextInfo, ResourceKey, Result,
};
use std::sync::Arc;
use uuid::Uuid;

/// Remote side of execution-context management
#[async_trait]
pub trait ExecutionContextApi: Send + Sync {
    async fn create(
        &self,
        connection: &ConnectionKey,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo>;

    async fn update(
        &self,
        context: &ExecutionContextInfo,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo>;

    async fn destroy(&self, context: &ExecutionContextInfo) -> Result<()>;
}

/// Execution contexts managed in-process
#[derive(Default)]
pub struct LocalExecutionContextApi;

#[async_trait]
impl ExecutionContextApi for LocalExecutionContextApi {
    async fn create(
        &self,
        connection: &ConnectionKey,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        Ok(ExecutionContextInfo {
            id: Uuid::new_v4().to_string(),
            project_id: connection.project_id.clone(),
            connection_id: connection.connection_id.clone(),
            default_catalog: default_catalog.map(str::to_string),
            default_schema: default_schema.map(str::to_string),
        })
    }

    async fn update(
        &self,
        context: &ExecutionContextInfo,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        Ok(ExecutionContextInfo {
            default_catalog: default_catalog.map(str::to_string),
            default_schema: default_schema.map(str::to_string),
            ..context.clone()
        })
    }

    async fn destroy(&self, _context: &ExecutionContextInfo) -> Result<()> {
        Ok(())
    }
}

/// Snapshot store of live execution contexts
pub struct ConnectionExecutionContextResource {
    api: Arc<dyn ExecutionContextApi>,
    contexts: RwLock<IndexMap<String, ExecutionContextInfo>>,

    /// Fired after a context was created or updated
    pub on_item_add: EventExecutor<ResourceKey<String>>,

    /// Fired after contexts were removed
    pub on_item_delete: EventExecutor<ResourceKey<String>>,
}

impl ConnectionExecutionContextResource {
    pub fn new(api: Arc<dyn ExecutionContextApi>) -> Self {
        Self {
            api,
            contexts: RwLock::new(IndexMap::new()),
            on_item_add: EventExecutor::new(),
            on_item_delete: EventExecutor::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<ExecutionContextInfo> {
        self.contexts.read().get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.contexts.read().contains_key(id)
    }

    pub fn values(&self) -> Vec<ExecutionContextInfo> {
        self.contexts.read().values().cloned().collect()
    }

    /// Contexts opened on the given connection
    pub fn for_connection(&self, key: &ConnectionKey) -> Vec<ExecutionContextInfo> {
        self.contexts
            .read()
            .values()
            .filter(|context| &context.connection_key() == key)
            .cloned()
            .collect()
    }

    #[tracing::instrument(skip(self), fields(connection = %connection))]
    pub async fn create(
        &self,
        connection: &ConnectionKey,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        let context = self
            .api
            .create(connection, default_catalog, default_schema)
            .await?;

        self.contexts
            .write()
            .insert(context.id.clone(), context.clone());
        tracing::debug!(context_id = %context.id, "execution context created");

        self.on_item_add
            .execute(ResourceKey::One(context.id.clone()))
            .await;
        Ok(context)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: &str,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        let current = self
            .get(id)
            .ok_or_else(|| DeckError::NotFound(format!("Execution context {id}")))?;

        let context = self
            .api
            .update(&current, default_catalog, default_schema)
            .await?;

        self.contexts
            .write()
            .insert(context.id.clone(), context.clone());

        self.on_item_add
            .execute(ResourceKey::One(context.id.clone()))
            .await;
        Ok(context)
    }

    /// Destroy a context remotely and forget it
    #[tracing::instrument(skip(self))]
    pub async fn destroy(&self, id: &str) -> Result<()> {
        let Some(context) = self.get(id) else {
            return Ok(());
        };

        self.api.destroy(&context).await?;
        self.contexts.write().shift_remove(id);
        tracing::debug!("execution context destroyed");

        self.on_item_delete
            .execute(ResourceKey::One(id.to_string()))
            .await;
        Ok(())
    }

    /// Forget every context owned by the addressed connections.
    ///
    /// Used when connections go away; no remote call is made.
    pub async fn delete_for_connections(&self, key: &ResourceKey<ConnectionKey>) -> Vec<String> {
        let ids: Vec<String> = {
            let mut contexts = self.contexts.write();
            let ids: Vec<String> = contexts
                .values()
                .filter(|context| key.includes(&context.connection_key()))
                .map(|context| context.id.clone())
                .collect();
            for id in &ids {
                contexts.shift_remove(id);
            }
            ids
        };

        if !ids.is_empty() {
            tracing::debug!(count = ids.len(), "execution contexts dropped with connection");
            self.on_item_delete
                .execute(ResourceKey::List(ids.clone()))
                .await;
        }

        ids
    }
}

/// Handle to one live execution context
#[derive(Clone)]
pub struct ConnectionExecutionContext {
    id: String,
    resource: Arc<ConnectionExecutionContextResource>,
}

impl ConnectionExecutionContext {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current snapshot, `None` once the context is gone
    pub fn context(&self) -> Option<ExecutionContextInfo> {
        self.resource.get(&self.id)
    }

    pub async fn update(
        &self,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ExecutionContextInfo> {
        self.resource
            .update(&self.id, default_catalog, default_schema)
            .await
    }

    pub async fn destroy(&self) -> Result<()> {
        self.resource.destroy(&self.id).await
    }
}

/// Entry point for components working with execution contexts by id
pub struct ConnectionExecutionContextService {
    resource: Arc<ConnectionExecutionContextResource>,
}

impl ConnectionExecutionContextService {
    pub fn new(resource: Arc<ConnectionExecutionContextResource>) -> Self {
        Self { resource }
    }

    pub fn get(&self, id: &str) -> Option<ConnectionExecutionContext> {
        if !self.resource.has(id) {
            return None;
        }

        Some(ConnectionExecutionContext {
            id: id.to_string(),
            resource: self.resource.clone(),
        })
    }

    pub async fn create(
        &self,
        connection: &ConnectionKey,
        default_catalog: Option<&str>,
        default_schema: Option<&str>,
    ) -> Result<ConnectionExecutionContext> {
        let context = self
            .resource
            .create(connection, default_catalog, default_schema)
            .await?;

        Ok(ConnectionExecutionContext {
            id: context.id,
            resource: self.resource.clone(),
        })
    }

    pub fn resource(&self) -> Arc<ConnectionExecutionContextResource> {
        self.resource.clone()
    }
}
