//! Registry of live data sources, keyed by editor id

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CreateDataSourceOptions, SqlDataSource, SqlDataSourceProvider, SqlDataSourceSnapshot};
use crate::error::{DataSourceError, DataSourceResult};
use crate::SqlEditorTabState;

/// Stored form of one editor's data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDataSource {
    pub editor_id: String,
    /// Provider key the data source was created with
    pub key: String,
    #[serde(flatten)]
    pub snapshot: SqlDataSourceSnapshot,
}

struct DataSourceEntry {
    key: String,
    data_source: Arc<dyn SqlDataSource>,
}

/// Owns every data source; an editor id maps to at most one instance
pub struct SqlDataSourceService {
    providers: RwLock<HashMap<String, Arc<dyn SqlDataSourceProvider>>>,
    data_sources: RwLock<IndexMap<String, DataSourceEntry>>,
    /// Last known state of editors, live or unloaded
    snapshots: RwLock<IndexMap<String, PersistedDataSource>>,
    storage_path: Option<PathBuf>,
}

impl SqlDataSourceService {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            data_sources: RwLock::new(IndexMap::new()),
            snapshots: RwLock::new(IndexMap::new()),
            storage_path: None,
        }
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn register_provider(&self, provider: Arc<dyn SqlDataSourceProvider>) {
        let key = provider.key().to_string();
        tracing::debug!(%key, "registering data source provider");
        self.providers.write().insert(key, provider);
    }

    pub fn has_provider(&self, key: &str) -> bool {
        self.providers.read().contains_key(key)
    }

    pub fn get(&self, editor_id: &str) -> Option<Arc<dyn SqlDataSource>> {
        self.data_sources
            .read()
            .get(editor_id)
            .map(|entry| entry.data_source.clone())
    }

    pub fn has(&self, editor_id: &str) -> bool {
        self.data_sources.read().contains_key(editor_id)
    }

    /// Editor ids with a live data source
    pub fn editor_ids(&self) -> Vec<String> {
        self.data_sources.read().keys().cloned().collect()
    }

    /// Create the data source for an editor.
    ///
    /// An existing data source with the same provider key is returned as is;
    /// one with a different key is replaced. Options left unset are filled
    /// from the editor's stored snapshot.
    pub fn create(
        &self,
        state: &SqlEditorTabState,
        options: CreateDataSourceOptions,
    ) -> DataSourceResult<Arc<dyn SqlDataSource>> {
        if let Some(entry) = self.data_sources.read().get(&state.editor_id)
            && entry.key == state.datasource_key
        {
            return Ok(entry.data_source.clone());
        }

        let provider = self
            .providers
            .read()
            .get(&state.datasource_key)
            .cloned()
            .ok_or_else(|| DataSourceError::ProviderNotFound(state.datasource_key.clone()))?;

        let snapshot = self
            .snapshots
            .read()
            .get(&state.editor_id)
            .filter(|stored| stored.key == state.datasource_key)
            .map(|stored| stored.snapshot.clone());

        let data_source = provider.create(state, options.or_snapshot(snapshot))?;
        self.data_sources.write().insert(
            state.editor_id.clone(),
            DataSourceEntry {
                key: state.datasource_key.clone(),
                data_source: data_source.clone(),
            },
        );
        tracing::debug!(editor_id = %state.editor_id, key = %state.datasource_key, "data source created");

        Ok(data_source)
    }

    /// Whether the editor's data source may be destroyed; `true` when absent
    pub async fn can_destroy(&self, editor_id: &str) -> bool {
        match self.get(editor_id) {
            Some(data_source) => data_source.can_destroy().await,
            None => true,
        }
    }

    /// Remember the data source's state and release it
    #[tracing::instrument(skip(self))]
    pub async fn unload(&self, editor_id: &str) {
        let Some((key, data_source)) = self.entry(editor_id) else {
            return;
        };

        self.snapshots.write().insert(
            editor_id.to_string(),
            PersistedDataSource {
                editor_id: editor_id.to_string(),
                key,
                snapshot: data_source.snapshot(),
            },
        );
        data_source.dispose().await;
    }

    /// Forget the editor's data source and its stored state
    #[tracing::instrument(skip(self))]
    pub async fn destroy(&self, editor_id: &str) {
        self.snapshots.write().shift_remove(editor_id);
        let removed = self.data_sources.write().shift_remove(editor_id);

        if let Some(entry) = removed {
            entry.data_source.dispose().await;
            tracing::debug!("data source destroyed");
        }
    }

    /// Live data sources plus stored snapshots of unloaded ones
    pub fn persisted(&self) -> Vec<PersistedDataSource> {
        let mut persisted = self.snapshots.read().clone();

        for (editor_id, entry) in self.data_sources.read().iter() {
            persisted.insert(
                editor_id.clone(),
                PersistedDataSource {
                    editor_id: editor_id.clone(),
                    key: entry.key.clone(),
                    snapshot: entry.data_source.snapshot(),
                },
            );
        }

        persisted.into_values().collect()
    }

    /// Seed stored snapshots, e.g. before restoring a session
    pub fn load_snapshots(&self, snapshots: Vec<PersistedDataSource>) {
        let mut stored = self.snapshots.write();
        for snapshot in snapshots {
            stored.insert(snapshot.editor_id.clone(), snapshot);
        }
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Write all snapshots to the storage file
    pub async fn save_to_storage(&self) -> DataSourceResult<()> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.persisted())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        tracing::debug!(path = %path.display(), "data source snapshots saved");
        Ok(())
    }

    /// Read snapshots from the storage file; a missing file is not an error
    pub async fn load_from_storage(&self) -> DataSourceResult<usize> {
        let Some(path) = &self.storage_path else {
            return Ok(0);
        };

        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let snapshots: Vec<PersistedDataSource> = serde_json::from_str(&json)?;
        let count = snapshots.len();
        self.load_snapshots(snapshots);

        tracing::info!(count, path = %path.display(), "loaded data source snapshots");
        Ok(count)
    }

    fn entry(&self, editor_id: &str) -> Option<(String, Arc<dyn SqlDataSource>)> {
        self.data_sources
            .read()
            .get(editor_id)
            .map(|entry| (entry.key.clone(), entry.data_source.clone()))
    }
}

impl Default for SqlDataSourceService {
    fn default() -> Self {
        Self::new()
    }
}
