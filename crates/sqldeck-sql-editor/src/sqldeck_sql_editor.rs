//! SQLDeck SQL Editor - Editor state, data sources and result tabs
//!
//! This crate provides the pieces an SQL editor tab is built from:
//!
//! - [`SqlEditorTabState`] - Persisted per-tab state and its restore validation
//! - [`SqlDataSource`] / [`SqlDataSourceService`] - Script + execution context
//!   per editor, created by pluggable providers
//! - [`SqlResultTabsService`] - Result tab bookkeeping and close checks
//! - [`SqlEditorService`] - Initial state, connection switching, context teardown

pub mod data_source;
mod editor_service;
mod error;
mod result_tabs;
mod state;

pub use data_source::{
    CreateDataSourceOptions, FileDataSourceProvider, FileSqlDataSource, MemoryDataSourceProvider,
    MemorySqlDataSource, PersistedDataSource, SqlDataSource, SqlDataSourceFeature,
    SqlDataSourceProvider, SqlDataSourceService, SqlDataSourceSnapshot,
};
pub use editor_service::SqlEditorService;
pub use error::{DataSourceError, DataSourceResult};
pub use result_tabs::{CloseResultTabsRequest, SqlResultTabsService};
pub use state::{
    SqlEditorTab, SqlEditorTabState, SqlExecutionPlanTab, SqlResultGroup, SqlResultTab,
    SqlStatisticsTab, StateShapeError, validate_persisted_state,
};
