//! In-memory data source

use parking_lot::RwLock;
use sqldeck_core::{ExecutionContextInfo, SyncEventExecutor};
use std::sync::Arc;

use super::{CreateDataSourceOptions, SqlDataSource, SqlDataSourceFeature, SqlDataSourceProvider};
use crate::SqlEditorTabState;
use crate::error::DataSourceResult;

const FEATURES: &[SqlDataSourceFeature] = &[
    SqlDataSourceFeature::Script,
    SqlDataSourceFeature::Query,
    SqlDataSourceFeature::Executable,
    SqlDataSourceFeature::SetName,
];

#[derive(Default)]
struct MemoryState {
    name: Option<String>,
    script: String,
    execution_context: Option<ExecutionContextInfo>,
    outdated: bool,
}

/// Script kept in memory; persisted only through registry snapshots
pub struct MemorySqlDataSource {
    state: RwLock<MemoryState>,
    on_set_script: SyncEventExecutor<String>,
}

impl MemorySqlDataSource {
    pub fn new(options: CreateDataSourceOptions) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                name: options.name,
                script: options.script.unwrap_or_default(),
                execution_context: options.execution_context,
                outdated: false,
            }),
            on_set_script: SyncEventExecutor::new(),
        }
    }
}

impl SqlDataSource for MemorySqlDataSource {
    fn name(&self) -> Option<String> {
        self.state.read().name.clone()
    }

    fn script(&self) -> String {
        self.state.read().script.clone()
    }

    fn execution_context(&self) -> Option<ExecutionContextInfo> {
        self.state.read().execution_context.clone()
    }

    fn message(&self) -> Option<String> {
        None
    }

    fn features(&self) -> &[SqlDataSourceFeature] {
        FEATURES
    }

    fn on_set_script(&self) -> &SyncEventExecutor<String> {
        &self.on_set_script
    }

    fn is_readonly(&self) -> bool {
        false
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

    fn can_rename(&self, name: Option<&str>) -> bool {
        name.is_none_or(|name| !name.trim().is_empty())
    }

    fn set_name(&self, name: Option<String>) {
        self.state.write().name = name;
    }

    fn set_script(&self, script: String) {
        self.state.write().script = script.clone();
        self.on_set_script.execute(&script);
    }

    fn set_execution_context(&self, context: Option<ExecutionContextInfo>) {
        self.state.write().execution_context = context;
    }
}

/// Provider for [`MemorySqlDataSource`]
pub struct MemoryDataSourceProvider;

impl MemoryDataSourceProvider {
    pub const KEY: &'static str = "memory";
}

impl SqlDataSourceProvider for MemoryDataSourceProvider {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn create(
        &self,
        _state: &SqlEditorTabState,
        options: CreateDataSourceOptions,
    ) -> DataSourceResult<Arc<dyn SqlDataSource>> {
        Ok(Arc::new(MemorySqlDataSource::new(options)))
    }
}
