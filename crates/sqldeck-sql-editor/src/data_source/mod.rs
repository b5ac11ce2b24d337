//! SQL data sources
//!
//! A data source is the per-editor record behind an SQL editor tab: the
//! script, its name and the (optional) execution-context binding. Data
//! sources are created by providers keyed by the tab's `datasource_key` and
//! owned by [`SqlDataSourceService`].

mod file;
mod memory;
mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqldeck_core::{ExecutionContextInfo, SyncEventExecutor};
use std::sync::Arc;

use crate::error::DataSourceResult;
use crate::SqlEditorTabState;

pub use file::{FileDataSourceProvider, FileSqlDataSource};
pub use memory::{MemoryDataSourceProvider, MemorySqlDataSource};
pub use service::{PersistedDataSource, SqlDataSourceService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SqlDataSourceFeature {
    Script,
    Query,
    Executable,
    SetName,
}

/// Per-editor script and execution-context binding
#[async_trait]
pub trait SqlDataSource: Send + Sync {
    fn name(&self) -> Option<String>;

    fn script(&self) -> String;

    /// Snapshot of the bound execution context
    fn execution_context(&self) -> Option<ExecutionContextInfo>;

    /// Status line shown in the editor (e.g. load errors)
    fn message(&self) -> Option<String>;

    fn features(&self) -> &[SqlDataSourceFeature];

    /// Fired after the script changed
    fn on_set_script(&self) -> &SyncEventExecutor<String>;

    fn is_readonly(&self) -> bool;

    fn is_outdated(&self) -> bool;

    fn mark_outdated(&self);

    fn mark_updated(&self);

    fn can_rename(&self, name: Option<&str>) -> bool;

    fn set_name(&self, name: Option<String>);

    fn set_script(&self, script: String);

    fn set_execution_context(&self, context: Option<ExecutionContextInfo>);

    fn is_loaded(&self) -> bool {
        true
    }

    async fn load(&self) -> DataSourceResult<()> {
        Ok(())
    }

    /// Release transient resources
    async fn dispose(&self) {}

    /// Whether the data source may be destroyed without losing work
    async fn can_destroy(&self) -> bool {
        true
    }

    fn snapshot(&self) -> SqlDataSourceSnapshot {
        SqlDataSourceSnapshot {
            name: self.name(),
            script: self.script(),
            execution_context: self.execution_context(),
        }
    }
}

/// What a data source carries across sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDataSourceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context: Option<ExecutionContextInfo>,
}

/// Initial values for a new data source
#[derive(Debug, Clone, Default)]
pub struct CreateDataSourceOptions {
    pub name: Option<String>,
    pub script: Option<String>,
    pub execution_context: Option<ExecutionContextInfo>,
}

impl CreateDataSourceOptions {
    /// Fill unset options from a persisted snapshot
    pub fn or_snapshot(self, snapshot: Option<SqlDataSourceSnapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return self;
        };

        Self {
            name: self.name.or(snapshot.name),
            script: self.script.or(Some(snapshot.script)),
            execution_context: self.execution_context.or(snapshot.execution_context),
        }
    }
}

/// Creates data sources of one kind
pub trait SqlDataSourceProvider: Send + Sync {
    fn key(&self) -> &str;

    fn create(
        &self,
        state: &SqlEditorTabState,
        options: CreateDataSourceOptions,
    ) -> DataSourceResult<Arc<dyn SqlDataSource>>;
}
