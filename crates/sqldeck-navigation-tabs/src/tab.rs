//! Tab records

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An open tab
#[derive(Debug, Clone)]
pub struct Tab<S> {
    pub id: String,
    pub handler_id: String,
    /// Project the tab is attached to, `None` when detached
    pub project_id: Option<String>,
    pub handler_state: S,
}

impl<S> Tab<S> {
    pub fn from_options(options: TabOptions<S>) -> Self {
        Self {
            id: options.id,
            handler_id: options.handler_id,
            project_id: options.project_id,
            handler_state: options.handler_state,
        }
    }
}

/// Shared handle to an open tab.
///
/// Locks are taken briefly and never held across an `.await`.
pub type TabRef<S> = Arc<RwLock<Tab<S>>>;

/// Everything needed to open a tab
#[derive(Debug, Clone)]
pub struct TabOptions<S> {
    pub id: String,
    pub project_id: Option<String>,
    pub handler_id: String,
    pub handler_state: S,
}

/// Tab as written to the session file.
///
/// The handler state is kept as raw JSON: it is only trusted after the
/// owning handler validated it during restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTab {
    pub id: String,
    pub handler_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub handler_state: serde_json::Value,
}

/// Persisted tab session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSession {
    pub tabs: Vec<PersistedTab>,
    pub current_tab_id: Option<String>,
}
