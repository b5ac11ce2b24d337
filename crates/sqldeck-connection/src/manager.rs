//! Connection lifecycle: connect, vetoable disconnect, delete

use sqldeck_core::{ConnectionKey, DeckError, EventExecutor, ResourceKey, Result};
use std::sync::Arc;

use crate::{ConnectionExecutionContextResource, ConnectionInfoResource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionExecutorState {
    /// Listeners may interrupt to veto the disconnect
    Before,
    After,
}

/// Payload of [`ConnectionsManagerService::on_disconnect`]
#[derive(Debug, Clone)]
pub struct ConnectionExecutorData {
    pub connections: Vec<ConnectionKey>,
    pub state: ConnectionExecutorState,
}

/// Orchestrates connection state changes and notifies listeners
pub struct ConnectionsManagerService {
    connections: Arc<ConnectionInfoResource>,
    contexts: Arc<ConnectionExecutionContextResource>,
    pub on_disconnect: EventExecutor<ConnectionExecutorData>,
}

impl ConnectionsManagerService {
    pub fn new(
        connections: Arc<ConnectionInfoResource>,
        contexts: Arc<ConnectionExecutionContextResource>,
    ) -> Self {
        Self {
            connections,
            contexts,
            on_disconnect: EventExecutor::new(),
        }
    }

    #[tracing::instrument(skip(self), fields(connection = %key))]
    pub async fn connect(&self, key: &ConnectionKey) -> Result<()> {
        self.connections.load(ResourceKey::One(key.clone())).await?;
        self.connections.set_connected(key, true)?;
        tracing::info!("connection established");
        Ok(())
    }

    /// Disconnect the given connections.
    ///
    /// Returns `Ok(false)` when a listener vetoed; nothing is changed then.
    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn disconnect(&self, keys: Vec<ConnectionKey>) -> Result<bool> {
        let connected: Vec<ConnectionKey> = keys
            .into_iter()
            .filter(|key| {
                self.connections
                    .get(key)
                    .map(|info| info.connected)
                    .unwrap_or(false)
            })
            .collect();

        if connected.is_empty() {
            return Ok(true);
        }

        let context = self
            .on_disconnect
            .execute(ConnectionExecutorData {
                connections: connected.clone(),
                state: ConnectionExecutorState::Before,
            })
            .await;

        if context.is_interrupted() {
            tracing::info!("disconnect interrupted by listener");
            return Ok(false);
        }

        self.contexts
            .delete_for_connections(&ResourceKey::List(connected.clone()))
            .await;

        for key in &connected {
            self.connections.set_connected(key, false)?;
        }

        self.on_disconnect
            .execute(ConnectionExecutorData {
                connections: connected,
                state: ConnectionExecutorState::After,
            })
            .await;

        tracing::info!("connections disconnected");
        Ok(true)
    }

    /// Remove a connection. Returns `Ok(false)` if its disconnect was vetoed.
    #[tracing::instrument(skip(self), fields(connection = %key))]
    pub async fn delete_connection(&self, key: &ConnectionKey) -> Result<bool> {
        if !self.connections.has(key) {
            return Err(DeckError::NotFound(format!("Connection {key}")));
        }

        if !self.disconnect(vec![key.clone()]).await? {
            return Ok(false);
        }

        let resource_key = ResourceKey::One(key.clone());
        self.contexts.delete_for_connections(&resource_key).await;
        self.connections.delete(resource_key).await?;

        Ok(true)
    }
}
