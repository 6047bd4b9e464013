use relsync_core::prelude::*;
use relsync_core::registry::{GROUP_MEMBER_ADDED, GROUP_MEMBER_REMOVED};
use relsync_core::{MappingAction, MappingDeclaration};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn setup(namespace: &str) -> (MockEngine, MappingRegistry) {
    let mock = MockEngine::new();
    let writer = RelationshipWriter::new(Arc::new(mock.clone()), TupleCodec::with_namespace(namespace));
    (mock, MappingRegistry::new(writer))
}

fn owner_mapping() -> RelationshipMapping {
    RelationshipMapping::new("agent.created", "owner")
        .resource("agent", Extractor::pointer("/agent/id"))
        .subject("user", Extractor::pointer("/userId"))
}

#[tokio::test]
async fn test_mapping_writes_relationship() {
    let (mock, mut registry) = setup("");
    registry.register(owner_mapping());
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher
        .emit("agent.created", json!({"agent": {"id": "a1"}, "userId": "alice"}))
        .await;

    assert_eq!(summary.synced, 1);
    assert_eq!(summary.failed, 0);
    assert!(mock.has_relationship("agent:a1", "owner", "user:alice"));
}

#[tokio::test]
async fn test_unknown_event_is_noop() {
    let (mock, registry) = setup("");
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher.dispatch("nothing.happened", json!({})).await;
    assert_eq!(summary.total(), 0);
    assert_eq!(summary.event, "nothing.happened");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_empty_extraction_skips_without_write() {
    let (mock, mut registry) = setup("");
    registry.register(owner_mapping());
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher
        .emit("agent.created", json!({"agent": {"id": ""}, "userId": "alice"}))
        .await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.synced, 0);
    assert_eq!(mock.write_requests().len(), 0);
}

#[tokio::test]
async fn test_failing_handler_does_not_stop_sibling() {
    let (mock, mut registry) = setup("");
    registry
        .register_handler("agent.created", |_| async {
            Err(SyncError::Handler("boom".into()))
        })
        .register(owner_mapping());
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher
        .emit("agent.created", json!({"agent": {"id": "a1"}, "userId": "alice"}))
        .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.synced, 1);
    assert!(mock.has_relationship("agent:a1", "owner", "user:alice"));
}

#[tokio::test]
async fn test_engine_failure_is_contained() {
    let (mock, mut registry) = setup("");
    registry.register(owner_mapping()).register(
        RelationshipMapping::new("agent.created", "creator")
            .resource("agent", Extractor::pointer("/agent/id"))
            .subject("user", Extractor::pointer("/userId")),
    );
    mock.fail_writes("engine down");
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher
        .emit("agent.created", json!({"agent": {"id": "a1"}, "userId": "alice"}))
        .await;

    assert_eq!(summary.failed, 2);
    assert_eq!(mock.write_requests().len(), 2);
}

#[tokio::test]
async fn test_panicking_handler_is_isolated() {
    let (mock, mut registry) = setup("");
    registry
        .register(
            RelationshipMapping::new("agent.created", "owner")
                .resource("agent", Extractor::from_fn(|_| panic!("extractor blew up")))
                .subject("user", Extractor::pointer("/userId")),
        )
        .register(owner_mapping());
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher
        .emit("agent.created", json!({"agent": {"id": "a1"}, "userId": "alice"}))
        .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.synced, 1);
    assert!(mock.has_relationship("agent:a1", "owner", "user:alice"));
}

#[tokio::test]
async fn test_group_membership_builtins() {
    let (mock, mut registry) = setup("t1_");
    registry.register_builtins(&GroupSyncConfig::enabled());
    let dispatcher = EventDispatcher::new(registry);
    let payload = json!({"groupId": "eng", "userId": "bob"});

    dispatcher.emit(GROUP_MEMBER_ADDED, payload.clone()).await;
    assert!(mock.has_relationship("group:t1_eng", "member", "user:t1_bob"));

    dispatcher.emit(GROUP_MEMBER_REMOVED, payload).await;
    assert!(!mock.has_relationship("group:t1_eng", "member", "user:t1_bob"));
}

#[tokio::test]
async fn test_removal_mapping_deletes() {
    let (mock, mut registry) = setup("");
    mock.add_relationship("agent:a1", "owner", "user:alice");
    registry.register_removal(
        RelationshipMapping::new("agent.deleted", "owner")
            .resource("agent", Extractor::pointer("/agentId"))
            .subject("user", Extractor::pointer("/userId")),
    );
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher
        .emit("agent.deleted", json!({"agentId": "a1", "userId": "alice"}))
        .await;
    assert_eq!(summary.synced, 1);
    assert!(!mock.has_relationship("agent:a1", "owner", "user:alice"));
}

#[tokio::test]
async fn test_declaration_with_numeric_ids() {
    let (mock, mut registry) = setup("");
    registry.register_declaration(&MappingDeclaration {
        event: "ticket.assigned".into(),
        resource_type: "ticket".into(),
        resource_id: "/ticket/id".into(),
        relation: "assignee".into(),
        subject_type: "user".into(),
        subject_id: "/assignee".into(),
        action: MappingAction::Touch,
    });
    let dispatcher = EventDispatcher::new(registry);

    dispatcher
        .emit("ticket.assigned", json!({"ticket": {"id": 42}, "assignee": "carol"}))
        .await;
    assert!(mock.has_relationship("ticket:42", "assignee", "user:carol"));
}

#[tokio::test]
async fn test_handlers_run_concurrently() {
    let (_mock, mut registry) = setup("");
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let running = running.clone();
        let peak = peak.clone();
        registry.register_handler("batch", move |_| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(HandlerOutcome::Synced)
            }
        });
    }
    let dispatcher = EventDispatcher::new(registry);

    let summary = dispatcher.emit("batch", json!({})).await;
    assert_eq!(summary.synced, 3);
    assert!(peak.load(Ordering::SeqCst) > 1);
}
