use futures_util::StreamExt;
use relsync_core::engine::{
    Consistency, ObjectReference, PermissionCheck, Permissionship, ResourceLookup,
};
use relsync_core::{AuthzEngine, EngineError, MockEngine, PermissionRule};

fn lookup(resource_type: &str, permission: &str, subject: &str) -> ResourceLookup {
    ResourceLookup {
        consistency: Consistency::FullyConsistent,
        resource_type: resource_type.into(),
        permission: permission.into(),
        subject: ObjectReference::new("user", subject).into(),
        context: None,
    }
}

#[test]
fn test_add_and_remove_relationship() {
    let mock = MockEngine::new();
    mock.add_relationship("document:1", "viewer", "user:alice");
    assert!(mock.has_relationship("document:1", "viewer", "user:alice"));
    assert!(!mock.has_relationship("document:1", "editor", "user:alice"));
    assert_eq!(mock.relationship_count(), 1);

    mock.remove_relationship("document:1", "viewer", "user:alice");
    assert!(!mock.has_relationship("document:1", "viewer", "user:alice"));
}

#[tokio::test]
async fn test_lookup_evaluates_rules() {
    let mock = MockEngine::new();
    mock.define_permission(
        "document",
        "view",
        [PermissionRule::relation("viewer"), PermissionRule::relation("editor")],
    );
    mock.add_relationship("document:2", "editor", "user:alice");
    mock.add_relationship("document:1", "viewer", "user:alice");
    mock.add_relationship("document:3", "viewer", "user:bob");
    mock.add_relationship("folder:9", "viewer", "user:alice");

    let stream = mock.lookup_resources(lookup("document", "view", "alice")).await.unwrap();
    let ids: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(ids, ["1", "2"]);
}

#[tokio::test]
async fn test_scripted_lookup_is_consumed_once() {
    let mock = MockEngine::new();
    mock.script_lookup(vec![Ok("x".into()), Err(EngineError::Stream("reset".into()))]);

    let items: Vec<Result<String, EngineError>> = mock
        .lookup_resources(lookup("document", "view", "alice"))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert!(items[1].is_err());

    let items: Vec<Result<String, EngineError>> = mock
        .lookup_resources(lookup("document", "view", "alice"))
        .await
        .unwrap()
        .collect()
        .await;
    assert!(items.is_empty());
    assert_eq!(mock.lookup_requests().len(), 2);
}

#[tokio::test]
async fn test_check_fault_injection() {
    let mock = MockEngine::new();
    mock.add_relationship("document:1", "viewer", "user:alice");
    mock.fail_check_on("document:1", "boom");

    let check = PermissionCheck {
        consistency: Consistency::MinimizeLatency,
        resource: ObjectReference::new("document", "1"),
        permission: "viewer".into(),
        subject: ObjectReference::new("user", "alice").into(),
        context: None,
    };
    let err = mock.check_permission(check.clone()).await.unwrap_err();
    assert_eq!(err, EngineError::Server("boom".into()));

    mock.clear_faults();
    assert_eq!(
        mock.check_permission(check).await.unwrap(),
        Permissionship::HasPermission
    );
    assert_eq!(mock.check_requests().len(), 2);
}
