//! SQLDeck SQL Editor Tabs - SQL editors hosted in navigation tabs
//!
//! [`SqlEditorTabService`] registers the SQL editor tab kind with the tab
//! host and keeps every open editor's data source consistent with the
//! connection and execution-context lifecycle:
//!
//! - New editors get the lowest free display order
//! - Deleted connections and contexts unbind the editors using them
//! - A disconnect is vetoed while an affected editor refuses to close
//! - Persisted tabs are validated before anything is recreated

mod lifecycle;
mod service;

pub use service::{SqlEditorTabDependencies, SqlEditorTabRef, SqlEditorTabService};

/// Handler key of SQL editor tabs
pub const SQL_EDITOR_TAB_HANDLER_KEY: &str = "sql_editor_tab";
