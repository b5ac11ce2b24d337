//! Data source backed by a script file on disk

use async_trait::async_trait;
use parking_lot::RwLock;
use sqldeck_core::{ExecutionContextInfo, SyncEventExecutor};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{CreateDataSourceOptions, SqlDataSource, SqlDataSourceFeature, SqlDataSourceProvider};
use crate::error::{DataSourceError, DataSourceResult};
use crate::SqlEditorTabState;

const FEATURES: &[SqlDataSourceFeature] = &[
    SqlDataSourceFeature::Script,
    SqlDataSourceFeature::Query,
    SqlDataSourceFeature::Executable,
];

struct FileState {
    name: Option<String>,
    /// `None` until loaded, or after a clean dispose
    script: Option<String>,
    /// Content last read from or written to disk
    saved: Option<String>,
    execution_context: Option<ExecutionContextInfo>,
    readonly: bool,
    outdated: bool,
    message: Option<String>,
}

/// Script stored in `<root>/<editor_id>.sql`
pub struct FileSqlDataSource {
    path: PathBuf,
    state: RwLock<FileState>,
    on_set_script: SyncEventExecutor<String>,
}

impl FileSqlDataSource {
    pub fn new(path: impl Into<PathBuf>, options: CreateDataSourceOptions) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(FileState {
                name: options.name,
                script: options.script,
                saved: None,
                execution_context: options.execution_context,
                readonly: false,
                outdated: false,
                message: None,
            }),
            on_set_script: SyncEventExecutor::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the script differs from what is on disk
    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.state.read();
        match (&state.script, &state.saved) {
            (Some(script), Some(saved)) => script != saved,
            (Some(script), None) => !script.is_empty(),
            (None, _) => false,
        }
    }

    /// Write the current script to disk
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) -> DataSourceResult<()> {
        let script = {
            let state = self.state.read();
            if state.readonly {
                return Err(DataSourceError::Readonly);
            }
            state.script.clone().unwrap_or_default()
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &script).await?;

        let mut state = self.state.write();
        state.saved = Some(script);
        state.outdated = false;
        tracing::debug!("script saved");
        Ok(())
    }
}

#[async_trait]
impl SqlDataSource for FileSqlDataSource {
    fn name(&self) -> Option<String> {
        self.state.read().name.clone().or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }

    fn script(&self) -> String {
        self.state.read().script.clone().unwrap_or_default()
    }

    fn execution_context(&self) -> Option<ExecutionContextInfo> {
        self.state.read().execution_context.clone()
    }

    fn message(&self) -> Option<String> {
        self.state.read().message.clone()
    }

    fn features(&self) -> &[SqlDataSourceFeature] {
        FEATURES
    }

    fn on_set_script(&self) -> &SyncEventExecutor<String> {
        &self.on_set_script
    }

    fn is_readonly(&self) -> bool {
        self.state.read().readonly
    }

    fn is_outdated(&self) -> bool {
        self.state.read().outdated
    }

    fn mark_outdated(&self) {
        self.state.write().outdated = true;
    }

    fn mark_updated(&self) {
        self.state.write().outdated = false;
    }

    fn can_rename(&self, _name: Option<&str>) -> bool {
        false
    }

    fn set_name(&self, _name: Option<String>) {}

    fn set_script(&self, script: String) {
        {
            let mut state = self.state.write();
            if state.readonly {
                tracing::warn!(path = %self.path.display(), "ignoring edit of read-only script");
                return;
            }
            state.script = Some(script.clone());
        }
        self.on_set_script.execute(&script);
    }

    fn set_execution_context(&self, context: Option<ExecutionContextInfo>) {
        self.state.write().execution_context = context;
    }

    fn is_loaded(&self) -> bool {
        self.state.read().saved.is_some()
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> DataSourceResult<()> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                self.state.write().message = Some(e.to_string());
                return Err(e.into());
            }
        };

        let readonly = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata.permissions().readonly(),
            Err(_) => false,
        };

        let mut state = self.state.write();
        // Keep edits made before the first load
        if state.script.is_none() {
            state.script = Some(content.clone());
        }
        state.saved = Some(content);
        state.readonly = readonly;
        state.outdated = false;
        state.message = None;
        Ok(())
    }

    async fn dispose(&self) {
        if self.has_unsaved_changes() {
            return;
        }
        let mut state = self.state.write();
        state.script = None;
        state.saved = None;
    }

    async fn can_destroy(&self) -> bool {
        !self.has_unsaved_changes()
    }
}

/// Provider for [`FileSqlDataSource`]
pub struct FileDataSourceProvider {
    root: PathBuf,
}

impl FileDataSourceProvider {
    pub const KEY: &'static str = "file";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Script file of an editor; the id must be a single plain file name
    pub fn script_path(&self, editor_id: &str) -> DataSourceResult<PathBuf> {
        let mut components = Path::new(editor_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(format!("{editor_id}.sql"))),
            _ => Err(DataSourceError::InvalidEditorId(editor_id.to_string())),
        }
    }
}

impl SqlDataSourceProvider for FileDataSourceProvider {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn create(
        &self,
        state: &SqlEditorTabState,
        options: CreateDataSourceOptions,
    ) -> DataSourceResult<Arc<dyn SqlDataSource>> {
        let path = self.script_path(&state.editor_id)?;
        Ok(Arc::new(FileSqlDataSource::new(path, options)))
    }
}
