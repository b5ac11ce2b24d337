//! Integration tests for restoring persisted SQL editor tabs

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use sqldeck_core::ExecutionContextInfo;
use sqldeck_navigation_tabs::PersistedSession;
use sqldeck_sql_editor::{
    FileDataSourceProvider, MemoryDataSourceProvider, PersistedDataSource, SqlDataSource, SqlDataSourceSnapshot,
};

use common::{Harness, persisted_state, persisted_tab, project_of};

fn session(tab: sqldeck_navigation_tabs::PersistedTab) -> PersistedSession {
    PersistedSession {
        current_tab_id: Some(tab.id.clone()),
        tabs: vec![tab],
    }
}

fn stored_data_source(
    editor_id: &str,
    execution_context: Option<ExecutionContextInfo>,
) -> PersistedDataSource {
    PersistedDataSource {
        editor_id: editor_id.to_string(),
        key: MemoryDataSourceProvider::KEY.to_string(),
        snapshot: SqlDataSourceSnapshot {
            name: Some("Saved".into()),
            script: "select * from orders".into(),
            execution_context,
        },
    }
}

// ============ Invalid State ============

#[tokio::test]
async fn non_array_tabs_drop_the_tab_without_data_source() {
    let harness = Harness::new().await;
    let mut state = persisted_state("e1");
    state["tabs"] = json!({ "id": "result-1" });

    let restored = harness.tabs.restore(session(persisted_tab("t1", state))).await;

    assert_eq!(restored, 0);
    assert!(harness.tabs.get_tab("t1").is_none());
    assert!(!harness.data_sources.has("e1"));
    assert!(harness.tabs.current_tab().is_none());
}

#[tokio::test]
async fn invalid_state_destroys_stored_data_source() {
    let harness = Harness::new().await;
    harness
        .data_sources
        .load_snapshots(vec![stored_data_source("e1", None)]);
    let mut state = persisted_state("e1");
    state["order"] = json!("1");

    let restored = harness.tabs.restore(session(persisted_tab("t1", state))).await;

    assert_eq!(restored, 0);
    assert!(harness.data_sources.persisted().is_empty());
}

#[tokio::test]
async fn datasource_key_must_be_a_string() {
    let harness = Harness::new().await;
    let mut state = persisted_state("e1");
    state["datasourceKey"] = json!(null);

    assert_eq!(harness.tabs.restore(session(persisted_tab("t1", state))).await, 0);
}

#[tokio::test]
async fn negative_order_is_rejected() {
    let harness = Harness::new().await;
    let mut state = persisted_state("e1");
    state["order"] = json!(-3);

    assert_eq!(harness.tabs.restore(session(persisted_tab("t1", state))).await, 0);
    assert!(!harness.data_sources.has("e1"));
}

#[tokio::test]
async fn editor_id_escaping_script_dir_is_rejected() {
    let harness = Harness::new().await;

    for (tab_id, editor_id) in [("t1", "../../escape"), ("t2", "/tmp/escape")] {
        let mut state = persisted_state(editor_id);
        state["datasourceKey"] = json!(FileDataSourceProvider::KEY);

        let restored = harness
            .tabs
            .restore(session(persisted_tab(tab_id, state)))
            .await;

        assert_eq!(restored, 0);
        assert!(harness.tabs.get_tab(tab_id).is_none());
        assert!(!harness.data_sources.has(editor_id));
    }
}

// ============ Valid State ============

#[tokio::test]
async fn restore_clears_transient_result_state() {
    let harness = Harness::new().await;

    let restored = harness
        .tabs
        .restore(session(persisted_tab("t1", persisted_state("e1"))))
        .await;

    assert_eq!(restored, 1);
    let tab = harness.tabs.get_tab("t1").unwrap();
    let tab = tab.read();
    let state = &tab.handler_state;
    assert_eq!(state.current_tab_id.as_deref(), Some(""));
    assert!(state.tabs.is_empty());
    assert!(state.result_groups.is_empty());
    assert!(state.result_tabs.is_empty());
    assert!(state.execution_plan_tabs.is_empty());
    assert!(state.statistics_tabs.is_empty());
    assert_eq!(state.source.as_deref(), Some("navigator"));
    assert_eq!(state.order, 1);
    assert!(harness.data_sources.has("e1"));
}

#[tokio::test]
async fn restore_brings_back_script_and_binding() {
    let harness = Harness::new().await;
    let context = ExecutionContextInfo::new("ctx-1", "p1", "c1").with_schema("public");
    harness
        .data_sources
        .load_snapshots(vec![stored_data_source("e1", Some(context.clone()))]);

    harness
        .tabs
        .restore(session(persisted_tab("t1", persisted_state("e1"))))
        .await;

    let data_source = harness.data_sources.get("e1").unwrap();
    assert_eq!(data_source.script(), "select * from orders");
    assert_eq!(data_source.execution_context(), Some(context));
    let tab = harness.tabs.get_tab("t1").unwrap();
    assert_eq!(project_of(&tab).as_deref(), Some("p1"));
}

#[tokio::test]
async fn restore_resets_binding_to_unknown_connection() {
    let harness = Harness::new().await;
    harness.data_sources.load_snapshots(vec![stored_data_source(
        "e1",
        Some(ExecutionContextInfo::new("ctx-1", "p9", "removed")),
    )]);

    harness
        .tabs
        .restore(session(persisted_tab("t1", persisted_state("e1"))))
        .await;

    let tab = harness.tabs.get_tab("t1").unwrap();
    assert_eq!(project_of(&tab), None);
    assert_eq!(harness.data_sources.get("e1").unwrap().execution_context(), None);
    assert_eq!(
        harness.data_sources.get("e1").unwrap().script(),
        "select * from orders"
    );
}

#[tokio::test]
async fn restored_orders_count_toward_allocation() {
    let harness = Harness::new().await;
    harness
        .tabs
        .restore(session(persisted_tab("t1", persisted_state("e1"))))
        .await;

    let options = harness
        .service
        .create_new_editor("e2", "memory", None, None, None)
        .unwrap();

    assert_eq!(options.handler_state.order, 2);
}

#[tokio::test]
async fn session_survives_save_and_reload() {
    let harness = Harness::new().await;
    let tab = harness.open_editor("e1");
    tab.write().handler_state.current_mode_id = Some("sql".into());
    let session = harness.tabs.persisted().unwrap();
    let snapshots = harness.data_sources.persisted();

    let next = Harness::new().await;
    next.data_sources.load_snapshots(snapshots);
    assert_eq!(next.tabs.restore(session).await, 1);

    let restored = next.tabs.get_tab("e1").unwrap();
    assert_eq!(
        restored.read().handler_state.current_mode_id.as_deref(),
        Some("sql")
    );
}
