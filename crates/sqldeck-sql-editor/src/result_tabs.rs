//! Result tab bookkeeping for SQL editor tabs

use parking_lot::RwLock;
use sqldeck_core::EventExecutor;
use std::collections::HashSet;
use uuid::Uuid;

use crate::state::{SqlEditorTab, SqlResultGroup, SqlResultTab};
use crate::SqlEditorTabState;

/// Asked before result tabs with running queries are discarded.
///
/// Listeners interrupt the execution to keep the tabs (and their queries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseResultTabsRequest {
    pub editor_id: String,
    /// Groups with a query still in flight
    pub running_groups: Vec<String>,
}

/// Tracks which result groups are executing
pub struct SqlResultTabsService {
    executing: RwLock<HashSet<String>>,
    pub on_close_running: EventExecutor<CloseResultTabsRequest>,
}

impl SqlResultTabsService {
    pub fn new() -> Self {
        Self {
            executing: RwLock::new(HashSet::new()),
            on_close_running: EventExecutor::new(),
        }
    }

    /// Add a result group with its first result tab and select it
    pub fn create_group(&self, state: &mut SqlEditorTabState, query: impl Into<String>) -> String {
        let group_id = Uuid::new_v4().to_string();
        let tab_id = Uuid::new_v4().to_string();
        let order = state.result_groups.len() as u32;

        state.result_groups.push(SqlResultGroup {
            group_id: group_id.clone(),
            query: query.into(),
            order,
        });
        state.result_tabs.push(SqlResultTab {
            tab_id: tab_id.clone(),
            group_id: group_id.clone(),
            index_in_result_set: 0,
        });
        state.tabs.push(SqlEditorTab {
            id: tab_id.clone(),
            order: state.tabs.len() as u32,
        });
        state.current_tab_id = Some(tab_id);

        group_id
    }

    pub fn mark_executing(&self, group_id: &str, executing: bool) {
        let mut groups = self.executing.write();
        if executing {
            groups.insert(group_id.to_string());
        } else {
            groups.remove(group_id);
        }
    }

    pub fn is_executing(&self, group_id: &str) -> bool {
        self.executing.read().contains(group_id)
    }

    fn running_groups(&self, state: &SqlEditorTabState) -> Vec<String> {
        let executing = self.executing.read();
        state
            .result_groups
            .iter()
            .filter(|group| executing.contains(&group.group_id))
            .map(|group| group.group_id.clone())
            .collect()
    }

    /// Whether the editor's result tabs may be discarded.
    ///
    /// Idle tabs always may. With queries running, listeners of
    /// `on_close_running` get a chance to refuse; otherwise the queries are
    /// cancelled.
    #[tracing::instrument(skip(self, state), fields(editor_id = %state.editor_id))]
    pub async fn can_close_result_tabs(&self, state: &SqlEditorTabState) -> bool {
        let running_groups = self.running_groups(state);
        if running_groups.is_empty() {
            return true;
        }

        let context = self
            .on_close_running
            .execute(CloseResultTabsRequest {
                editor_id: state.editor_id.clone(),
                running_groups: running_groups.clone(),
            })
            .await;

        if context.is_interrupted() {
            tracing::debug!("closing result tabs refused");
            return false;
        }

        let mut executing = self.executing.write();
        for group_id in &running_groups {
            executing.remove(group_id);
        }
        tracing::debug!(cancelled = running_groups.len(), "running queries cancelled");
        true
    }

    /// Forget every result tab of the editor
    pub fn remove_result_tabs(&self, state: &mut SqlEditorTabState) {
        {
            let mut executing = self.executing.write();
            for group in &state.result_groups {
                executing.remove(&group.group_id);
            }
        }
        state.clear_results();
    }
}

impl Default for SqlResultTabsService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state() -> SqlEditorTabState {
        SqlEditorTabState::new("editor-1", "memory", 1, None)
    }

    #[test]
    fn test_create_group_selects_new_tab() {
        let service = SqlResultTabsService::new();
        let mut state = state();

        let group_id = service.create_group(&mut state, "select 1");

        assert_eq!(state.result_groups.len(), 1);
        assert_eq!(state.result_tabs[0].group_id, group_id);
        assert_eq!(state.current_tab_id.as_deref(), Some(state.tabs[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_idle_result_tabs_can_close() {
        let service = SqlResultTabsService::new();
        let mut state = state();
        service.create_group(&mut state, "select 1");

        assert!(service.can_close_result_tabs(&state).await);
    }

    #[tokio::test]
    async fn test_running_query_can_be_kept() {
        let service = SqlResultTabsService::new();
        let mut state = state();
        let group_id = service.create_group(&mut state, "select pg_sleep(10)");
        service.mark_executing(&group_id, true);

        service
            .on_close_running
            .add_handler(|_, context| async move { context.interrupt() });

        assert!(!service.can_close_result_tabs(&state).await);
        assert!(service.is_executing(&group_id));
    }

    #[tokio::test]
    async fn test_running_query_is_cancelled_on_close() {
        let service = SqlResultTabsService::new();
        let mut state = state();
        let group_id = service.create_group(&mut state, "select pg_sleep(10)");
        service.mark_executing(&group_id, true);

        assert!(service.can_close_result_tabs(&state).await);
        assert!(!service.is_executing(&group_id));
    }

    #[test]
    fn test_remove_result_tabs() {
        let service = SqlResultTabsService::new();
        let mut state = state();
        let group_id = service.create_group(&mut state, "select 1");
        service.mark_executing(&group_id, true);

        service.remove_result_tabs(&mut state);

        assert!(state.result_groups.is_empty());
        assert!(state.tabs.is_empty());
        assert!(!service.is_executing(&group_id));
    }
}
