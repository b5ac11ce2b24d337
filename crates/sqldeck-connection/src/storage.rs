//! Connection sources backing the connection registry

use async_trait::async_trait;
use parking_lot::RwLock;
use sqldeck_core::{ConnectionInfo, DeckError, Result};
use std::path::PathBuf;

/// Where the registry loads connections from and writes them back to
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn load_all(&self) -> Result<Vec<ConnectionInfo>>;

    async fn save_all(&self, connections: &[ConnectionInfo]) -> Result<()>;
}

/// Connections persisted as a JSON array on disk
pub struct JsonConnectionStorage {
    path: PathBuf,
}

impl JsonConnectionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl ConnectionSource for JsonConnectionStorage {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_all(&self) -> Result<Vec<ConnectionInfo>> {
        if !self.path.exists() {
            tracing::debug!("connections file doesn't exist");
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(DeckError::Io)?;

        let connections: Vec<ConnectionInfo> =
            serde_json::from_str(&content).map_err(DeckError::Serialization)?;

        tracing::info!(count = connections.len(), "connections loaded from storage");
        Ok(connections)
    }

    #[tracing::instrument(skip(self, connections), fields(path = %self.path.display()))]
    async fn save_all(&self, connections: &[ConnectionInfo]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DeckError::Io)?;
        }

        let content =
            serde_json::to_string_pretty(connections).map_err(DeckError::Serialization)?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(DeckError::Io)?;

        tracing::info!(count = connections.len(), "connections saved to storage");
        Ok(())
    }
}

/// In-memory connection source (no persistence)
#[derive(Default)]
pub struct MemoryConnectionSource {
    connections: RwLock<Vec<ConnectionInfo>>,
}

impl MemoryConnectionSource {
    pub fn new(connections: Vec<ConnectionInfo>) -> Self {
        Self {
            connections: RwLock::new(connections),
        }
    }
}

#[async_trait]
impl ConnectionSource for MemoryConnectionSource {
    async fn load_all(&self) -> Result<Vec<ConnectionInfo>> {
        Ok(self.connections.read().clone())
    }

    async fn save_all(&self, connections: &[ConnectionInfo]) -> Result<()> {
        *self.connections.write() = connections.to_vec();
        Ok(())
    }
}
