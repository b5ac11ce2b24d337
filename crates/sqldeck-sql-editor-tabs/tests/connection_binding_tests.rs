//! Integration tests for keeping editor bindings consistent with the
//! connection and execution-context lifecycle

mod common;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sqldeck_core::{ExecutionContextInfo, ResourceKey};
use std::sync::Arc;

use common::{
    Harness, main_connection, other_project_connection, project_of, reporting_connection,
};

// ============ Connection Delete ============

#[tokio::test]
async fn deleting_connection_resets_only_its_editors() {
    let harness = Harness::new().await;
    let main = harness.open_bound_editor("e1", &main_connection()).await;
    let reporting = harness
        .open_bound_editor("e2", &reporting_connection())
        .await;
    let analytics = harness
        .open_bound_editor("e3", &other_project_connection())
        .await;

    assert!(
        harness
            .manager
            .delete_connection(&main_connection())
            .await
            .unwrap()
    );

    assert_eq!(harness.execution_context(&main), None);
    assert_eq!(project_of(&main), None);

    let reporting_context = harness.execution_context(&reporting).unwrap();
    assert_eq!(reporting_context.connection_key(), reporting_connection());
    assert_eq!(project_of(&reporting).as_deref(), Some("p1"));

    let analytics_context = harness.execution_context(&analytics).unwrap();
    assert_eq!(analytics_context.connection_key(), other_project_connection());
    assert_eq!(project_of(&analytics).as_deref(), Some("p2"));
}

#[tokio::test]
async fn deleting_all_connections_resets_every_editor() {
    let harness = Harness::new().await;
    let main = harness.open_bound_editor("e1", &main_connection()).await;
    let analytics = harness
        .open_bound_editor("e2", &other_project_connection())
        .await;

    harness.connections.delete(ResourceKey::All).await.unwrap();

    assert_eq!(harness.execution_context(&main), None);
    assert_eq!(harness.execution_context(&analytics), None);
    assert_eq!(project_of(&analytics), None);
}

// ============ Disconnect Veto ============

#[tokio::test]
async fn refusing_editor_vetoes_disconnect() {
    let harness = Harness::new().await;
    harness.manager.connect(&main_connection()).await.unwrap();
    let tab = harness.open_bound_editor("e1", &main_connection()).await;
    let context = harness.execution_context(&tab).unwrap();

    harness
        .service
        .on_can_close
        .add_handler(|_, context| async move { context.interrupt() });

    let disconnected = harness
        .manager
        .disconnect(vec![main_connection()])
        .await
        .unwrap();

    assert!(!disconnected);
    assert!(harness.connections.get(&main_connection()).unwrap().connected);
    assert!(harness.contexts.has(&context.id));
    assert_eq!(harness.execution_context(&tab), Some(context));
}

#[tokio::test]
async fn disconnect_veto_stops_at_first_refusal() {
    let harness = Harness::new().await;
    harness.manager.connect(&main_connection()).await.unwrap();
    harness.open_bound_editor("e1", &main_connection()).await;
    harness.open_bound_editor("e2", &main_connection()).await;

    let asked = Arc::new(Mutex::new(Vec::new()));
    let sink = asked.clone();
    harness.service.on_can_close.add_handler(move |tab, context| {
        let sink = sink.clone();
        async move {
            let editor_id = tab.read().handler_state.editor_id.clone();
            sink.lock().push(editor_id);
            context.interrupt();
        }
    });

    assert!(
        !harness
            .manager
            .disconnect(vec![main_connection()])
            .await
            .unwrap()
    );
    assert_eq!(*asked.lock(), vec!["e1".to_string()]);
}

#[tokio::test]
async fn disconnect_only_asks_affected_editors() {
    let harness = Harness::new().await;
    harness.manager.connect(&main_connection()).await.unwrap();
    harness.open_bound_editor("e1", &reporting_connection()).await;

    let asked = Arc::new(Mutex::new(0));
    let counter = asked.clone();
    harness.service.on_can_close.add_handler(move |_, context| {
        let counter = counter.clone();
        async move {
            *counter.lock() += 1;
            context.interrupt();
        }
    });

    assert!(
        harness
            .manager
            .disconnect(vec![main_connection()])
            .await
            .unwrap()
    );
    assert_eq!(*asked.lock(), 0);
}

#[tokio::test]
async fn allowed_disconnect_drops_contexts_but_keeps_binding() {
    let harness = Harness::new().await;
    harness.manager.connect(&main_connection()).await.unwrap();
    let tab = harness.open_bound_editor("e1", &main_connection()).await;
    let context = harness.execution_context(&tab).unwrap();

    assert!(
        harness
            .manager
            .disconnect(vec![main_connection()])
            .await
            .unwrap()
    );

    assert!(!harness.contexts.has(&context.id));
    assert!(!harness.connections.get(&main_connection()).unwrap().connected);
    // The connection still exists, so the editor stays attached to it
    assert_eq!(harness.execution_context(&tab), Some(context));
    let tab = tab.read();
    assert_eq!(harness.service.get_object_catalog_id(&tab), None);
}

// ============ Execution Context Events ============

#[tokio::test]
async fn context_update_refreshes_snapshot_and_project() {
    let harness = Harness::new().await;
    let tab = harness.open_bound_editor("e1", &main_connection()).await;
    let context = harness.execution_context(&tab).unwrap();
    harness.service.attach_to_project(&mut tab.write(), None);

    harness
        .contexts
        .update(&context.id, Some("sales"), Some("public"))
        .await
        .unwrap();

    let refreshed = harness.execution_context(&tab).unwrap();
    assert_eq!(refreshed.default_catalog.as_deref(), Some("sales"));
    assert_eq!(refreshed.default_schema.as_deref(), Some("public"));
    assert_eq!(project_of(&tab).as_deref(), Some("p1"));
}

#[tokio::test]
async fn context_event_resets_editor_whose_connection_is_gone() {
    let harness = Harness::new().await;
    let orphan = harness.open_editor("orphan");
    let stale = harness.open_editor("stale");
    harness
        .data_sources
        .get("orphan")
        .unwrap()
        .set_execution_context(Some(ExecutionContextInfo::new("ghost-1", "p9", "c9")));
    harness
        .data_sources
        .get("stale")
        .unwrap()
        .set_execution_context(Some(ExecutionContextInfo::new("ghost-2", "p1", "c1")));

    // Any new context triggers the scan
    harness.open_bound_editor("e3", &reporting_connection()).await;

    assert_eq!(harness.execution_context(&orphan), None);
    assert_eq!(project_of(&orphan), None);
    assert_eq!(
        harness.execution_context(&stale).map(|context| context.id),
        Some("ghost-2".to_string())
    );
}

#[tokio::test]
async fn context_delete_resets_only_orphaned_editors() {
    let harness = Harness::new().await;
    let orphan = harness.open_editor("orphan");
    let kept = harness.open_editor("kept");
    harness
        .data_sources
        .get("orphan")
        .unwrap()
        .set_execution_context(Some(ExecutionContextInfo::new("ctx-1", "p9", "c9")));
    harness
        .data_sources
        .get("kept")
        .unwrap()
        .set_execution_context(Some(ExecutionContextInfo::new("ctx-2", "p1", "c1")));

    harness
        .contexts
        .on_item_delete
        .execute(ResourceKey::List(vec!["ctx-1".into(), "ctx-2".into()]))
        .await;

    assert_eq!(harness.execution_context(&orphan), None);
    assert!(harness.execution_context(&kept).is_some());
}

#[tokio::test]
async fn context_delete_ignores_other_ids() {
    let harness = Harness::new().await;
    let orphan = harness.open_editor("orphan");
    harness
        .data_sources
        .get("orphan")
        .unwrap()
        .set_execution_context(Some(ExecutionContextInfo::new("ctx-1", "p9", "c9")));

    harness
        .contexts
        .on_item_delete
        .execute(ResourceKey::One("ctx-other".into()))
        .await;

    assert!(harness.execution_context(&orphan).is_some());
}
