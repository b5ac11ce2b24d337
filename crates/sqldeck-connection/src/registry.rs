//! Registry of known connections

use indexmap::IndexMap;
use parking_lot::RwLock;
use sqldeck_core::{ConnectionInfo, ConnectionKey, DeckError, EventExecutor, ResourceKey, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ConnectionSource;

/// Write-through cache of the connections known to the console
pub struct ConnectionInfoResource {
    source: Arc<dyn ConnectionSource>,

    /// Known connections in load order
    connections: RwLock<IndexMap<ConnectionKey, ConnectionInfo>>,

    /// Whether a full load has happened
    loaded: AtomicBool,

    /// Fired after connections were removed
    pub on_item_delete: EventExecutor<ResourceKey<ConnectionKey>>,
}

impl ConnectionInfoResource {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self {
            source,
            connections: RwLock::new(IndexMap::new()),
            loaded: AtomicBool::new(false),
            on_item_delete: EventExecutor::new(),
        }
    }

    /// Make sure the addressed connections are present.
    ///
    /// `All` always refreshes from the source; explicit keys only trigger a
    /// refresh when one of them is missing.
    #[tracing::instrument(skip(self, key))]
    pub async fn load(&self, key: ResourceKey<ConnectionKey>) -> Result<()> {
        if let Some(keys) = key.keys() {
            let connections = self.connections.read();
            if keys.iter().all(|key| connections.contains_key(*key)) {
                return Ok(());
            }
        }

        let loaded = self.source.load_all().await?;
        let mut connections = self.connections.write();
        let previous = std::mem::take(&mut *connections);

        for mut info in loaded {
            // Connection state is runtime-only
            info.connected = previous
                .get(&info.key())
                .map(|existing| existing.connected)
                .unwrap_or(false);
            connections.insert(info.key(), info);
        }

        self.loaded.store(true, Ordering::SeqCst);
        tracing::debug!(count = connections.len(), "connections loaded");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn has(&self, key: &ConnectionKey) -> bool {
        self.connections.read().contains_key(key)
    }

    /// Whether `key` is addressed by `param`
    pub fn includes(&self, param: &ResourceKey<ConnectionKey>, key: &ConnectionKey) -> bool {
        param.includes(key)
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<ConnectionInfo> {
        self.connections.read().get(key).cloned()
    }

    pub fn values(&self) -> Vec<ConnectionInfo> {
        self.connections.read().values().cloned().collect()
    }

    /// Add or replace a connection and persist the registry
    #[tracing::instrument(skip(self, info), fields(connection = %info.key()))]
    pub async fn add(&self, info: ConnectionInfo) -> Result<()> {
        self.connections.write().insert(info.key(), info);
        self.persist().await
    }

    pub fn set_connected(&self, key: &ConnectionKey, connected: bool) -> Result<()> {
        let mut connections = self.connections.write();
        let info = connections
            .get_mut(key)
            .ok_or_else(|| DeckError::NotFound(format!("Connection {key}")))?;
        info.connected = connected;
        Ok(())
    }

    /// Remove the addressed connections, persist, then notify listeners
    #[tracing::instrument(skip(self, key))]
    pub async fn delete(&self, key: ResourceKey<ConnectionKey>) -> Result<Vec<ConnectionInfo>> {
        let removed: Vec<ConnectionInfo> = {
            let mut connections = self.connections.write();
            let keys: Vec<ConnectionKey> = connections
                .keys()
                .filter(|existing| key.includes(existing))
                .cloned()
                .collect();
            keys.iter()
                .filter_map(|k| connections.shift_remove(k))
                .collect()
        };

        if removed.is_empty() {
            return Ok(removed);
        }

        self.persist().await?;
        tracing::info!(count = removed.len(), "connections deleted");

        self.on_item_delete.execute(key).await;
        Ok(removed)
    }

    async fn persist(&self) -> Result<()> {
        let connections = self.values();
        self.source.save_all(&connections).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryConnectionSource;
    use parking_lot::Mutex;

    fn resource(connections: Vec<ConnectionInfo>) -> ConnectionInfoResource {
        ConnectionInfoResource::new(Arc::new(MemoryConnectionSource::new(connections)))
    }

    #[tokio::test]
    async fn test_load_all_populates_registry() {
        let resource = resource(vec![
            ConnectionInfo::new("p", "a", "A", "postgres"),
            ConnectionInfo::new("p", "b", "B", "sqlite"),
        ]);
        assert!(!resource.is_loaded());

        resource.load(ResourceKey::All).await.unwrap();

        assert!(resource.is_loaded());
        assert!(resource.has(&ConnectionKey::new("p", "a")));
        assert!(resource.has(&ConnectionKey::new("p", "b")));
        assert!(!resource.has(&ConnectionKey::new("other", "a")));
    }

    #[tokio::test]
    async fn test_reload_preserves_connected_flag() {
        let resource = resource(vec![ConnectionInfo::new("p", "a", "A", "postgres")]);
        resource.load(ResourceKey::All).await.unwrap();
        let key = ConnectionKey::new("p", "a");
        resource.set_connected(&key, true).unwrap();

        resource.load(ResourceKey::All).await.unwrap();

        assert!(resource.get(&key).unwrap().connected);
    }

    #[tokio::test]
    async fn test_delete_notifies_with_key() {
        let resource = resource(vec![
            ConnectionInfo::new("p", "a", "A", "postgres"),
            ConnectionInfo::new("p", "b", "B", "postgres"),
        ]);
        resource.load(ResourceKey::All).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        resource.on_item_delete.add_handler(move |key, _| {
            let sink = sink.clone();
            async move { sink.lock().push(key) }
        });

        let removed = resource
            .delete(ResourceKey::One(ConnectionKey::new("p", "a")))
            .await
            .unwrap();

        assert_eq!(removed.len(), 1);
        assert!(!resource.has(&ConnectionKey::new("p", "a")));
        assert!(resource.has(&ConnectionKey::new("p", "b")));
        assert_eq!(
            *seen.lock(),
            vec![ResourceKey::One(ConnectionKey::new("p", "a"))]
        );

        // Deleted connections stay deleted after a reload
        resource.load(ResourceKey::All).await.unwrap();
        assert!(!resource.has(&ConnectionKey::new("p", "a")));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_silent() {
        let resource = resource(vec![]);
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        resource.on_item_delete.add_handler(move |_, _| {
            let flag = flag.clone();
            async move { *flag.lock() = true }
        });

        let removed = resource
            .delete(ResourceKey::One(ConnectionKey::new("p", "missing")))
            .await
            .unwrap();

        assert!(removed.is_empty());
        assert!(!*fired.lock());
    }
}
