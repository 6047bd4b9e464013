//! In-memory engine for tests.

use super::{
    AuthzEngine, ObjectReference, PermissionCheck, Permissionship, Relationship,
    RelationshipUpdate, ResourceIdStream, ResourceLookup, SubjectReference, UpdateOperation,
};
use crate::error::EngineError;
use dashmap::{DashMap, DashSet};
use futures_util::StreamExt;
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const MAX_DEPTH: usize = 16;

/// How a permission is derived from stored relationships.
///
/// `view = department->member + owner` is expressed as
/// `[PermissionRule::arrow("department", "member"), PermissionRule::relation("owner")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRule {
    /// Subject holds the named relation (or permission) on the same resource.
    Relation(String),
    /// Follow `tupleset` to another object and evaluate `computed` there.
    Arrow { tupleset: String, computed: String },
}

impl PermissionRule {
    pub fn relation(relation: impl Into<String>) -> Self {
        PermissionRule::Relation(relation.into())
    }

    pub fn arrow(tupleset: impl Into<String>, computed: impl Into<String>) -> Self {
        PermissionRule::Arrow {
            tupleset: tupleset.into(),
            computed: computed.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Fault {
    Write,
    AnyCheck,
    Check(String),
    Lookup,
}

#[derive(Default)]
struct MockState {
    tuples: DashSet<Relationship>,
    rules: DashMap<(String, String), Vec<PermissionRule>>,
    faults: DashMap<Fault, String>,
    check_delays: DashMap<String, Duration>,
    scripted_lookup: Mutex<Option<Vec<Result<String, EngineError>>>>,
    writes: Mutex<Vec<RelationshipUpdate>>,
    checks: Mutex<Vec<PermissionCheck>>,
    lookups: Mutex<Vec<ResourceLookup>>,
}

/// In-memory engine for tests.
///
/// Stores relationships as wire (already namespaced) values in a `DashSet`
/// and evaluates permissions from simple rules, enough to model
/// `permission view = department->member + owner`. Failures, per-object
/// delays and scripted lookup streams can be injected, and every request is
/// recorded for assertions.
///
/// Clones share state, so keep a clone after handing one to the code under test.
///
/// # Example
///
/// ```ignore
/// let mock = MockEngine::new();
/// mock.add_relationship("department:eng", "member", "user:alice");
/// mock.add_relationship("agent:1", "department", "department:eng");
/// mock.define_permission("agent", "view", [
///     PermissionRule::arrow("department", "member"),
///     PermissionRule::relation("owner"),
/// ]);
/// ```
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<MockState>,
}

fn parse_object(value: &str) -> ObjectReference {
    match value.split_once(':') {
        Some((object_type, object_id)) => ObjectReference::new(object_type, object_id),
        None => ObjectReference::new(value, ""),
    }
}

fn format_object(object: &ObjectReference) -> String {
    format!("{}:{}", object.object_type, object.object_id)
}

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `resource#relation@subject`, each side given as `type:id`.
    pub fn add_relationship(&self, resource: &str, relation: &str, subject: &str) {
        self.state.tuples.insert(Relationship {
            resource: parse_object(resource),
            relation: relation.to_string(),
            subject: parse_object(subject).into(),
        });
    }

    pub fn remove_relationship(&self, resource: &str, relation: &str, subject: &str) {
        self.state.tuples.remove(&Relationship {
            resource: parse_object(resource),
            relation: relation.to_string(),
            subject: parse_object(subject).into(),
        });
    }

    /// Direct lookup only, no rule evaluation.
    pub fn has_relationship(&self, resource: &str, relation: &str, subject: &str) -> bool {
        self.state.tuples.contains(&Relationship {
            resource: parse_object(resource),
            relation: relation.to_string(),
            subject: parse_object(subject).into(),
        })
    }

    pub fn relationship_count(&self) -> usize {
        self.state.tuples.len()
    }

    /// Define how `permission` on `resource_type` is computed.
    pub fn define_permission(
        &self,
        resource_type: &str,
        permission: &str,
        rules: impl IntoIterator<Item = PermissionRule>,
    ) {
        self.state.rules.insert(
            (resource_type.to_string(), permission.to_string()),
            rules.into_iter().collect(),
        );
    }

    /// Make every relationship write fail.
    pub fn fail_writes(&self, message: &str) {
        self.state.faults.insert(Fault::Write, message.to_string());
    }

    /// Make every permission check fail.
    pub fn fail_checks(&self, message: &str) {
        self.state.faults.insert(Fault::AnyCheck, message.to_string());
    }

    /// Make checks on one resource (`type:id`, wire form) fail.
    pub fn fail_check_on(&self, resource: &str, message: &str) {
        self.state
            .faults
            .insert(Fault::Check(resource.to_string()), message.to_string());
    }

    /// Make opening a lookup stream fail.
    pub fn fail_lookups(&self, message: &str) {
        self.state.faults.insert(Fault::Lookup, message.to_string());
    }

    /// Delay checks on one resource (`type:id`, wire form).
    pub fn delay_check_on(&self, resource: &str, delay: Duration) {
        self.state.check_delays.insert(resource.to_string(), delay);
    }

    /// Replace the next lookup's stream with the given items, errors included.
    pub fn script_lookup(&self, items: Vec<Result<String, EngineError>>) {
        *locked(&self.state.scripted_lookup) = Some(items);
    }

    pub fn clear_faults(&self) {
        self.state.faults.clear();
    }

    pub fn write_requests(&self) -> Vec<RelationshipUpdate> {
        locked(&self.state.writes).clone()
    }

    pub fn check_requests(&self) -> Vec<PermissionCheck> {
        locked(&self.state.checks).clone()
    }

    pub fn lookup_requests(&self) -> Vec<ResourceLookup> {
        locked(&self.state.lookups).clone()
    }

    /// Total number of engine calls received.
    pub fn call_count(&self) -> usize {
        locked(&self.state.writes).len()
            + locked(&self.state.checks).len()
            + locked(&self.state.lookups).len()
    }

    fn evaluate(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject: &SubjectReference,
        depth: usize,
    ) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }

        let direct = Relationship {
            resource: resource.clone(),
            relation: permission.to_string(),
            subject: subject.clone(),
        };
        if self.state.tuples.contains(&direct) {
            return true;
        }

        let rules = match self
            .state
            .rules
            .get(&(resource.object_type.clone(), permission.to_string()))
        {
            Some(rules) => rules.clone(),
            None => return false,
        };

        rules.iter().any(|rule| match rule {
            PermissionRule::Relation(relation) => {
                self.evaluate(resource, relation, subject, depth + 1)
            }
            PermissionRule::Arrow { tupleset, computed } => {
                let targets: Vec<ObjectReference> = self
                    .state
                    .tuples
                    .iter()
                    .filter(|t| &t.resource == resource && &t.relation == tupleset)
                    .map(|t| t.subject.object.clone())
                    .collect();
                targets
                    .iter()
                    .any(|target| self.evaluate(target, computed, subject, depth + 1))
            }
        })
    }

    fn fault(&self, fault: &Fault) -> Option<String> {
        self.state.faults.get(fault).map(|msg| msg.clone())
    }
}

impl AuthzEngine for MockEngine {
    fn write_relationships(
        &self,
        updates: Vec<RelationshipUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + '_>> {
        Box::pin(async move {
            locked(&self.state.writes).extend(updates.iter().cloned());
            if let Some(msg) = self.fault(&Fault::Write) {
                return Err(EngineError::Server(msg));
            }
            for update in updates {
                match update.operation {
                    UpdateOperation::Touch => {
                        self.state.tuples.insert(update.relationship);
                    }
                    UpdateOperation::Delete => {
                        self.state.tuples.remove(&update.relationship);
                    }
                }
            }
            Ok(())
        })
    }

    fn check_permission(
        &self,
        check: PermissionCheck,
    ) -> Pin<Box<dyn Future<Output = Result<Permissionship, EngineError>> + Send + '_>> {
        Box::pin(async move {
            locked(&self.state.checks).push(check.clone());
            let resource = format_object(&check.resource);

            let delay = self.state.check_delays.get(&resource).map(|d| *d);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(msg) = self
                .fault(&Fault::AnyCheck)
                .or_else(|| self.fault(&Fault::Check(resource)))
            {
                return Err(EngineError::Server(msg));
            }

            let allowed = self.evaluate(&check.resource, &check.permission, &check.subject, 0);
            Ok(if allowed {
                Permissionship::HasPermission
            } else {
                Permissionship::NoPermission
            })
        })
    }

    fn lookup_resources(
        &self,
        lookup: ResourceLookup,
    ) -> Pin<Box<dyn Future<Output = Result<ResourceIdStream, EngineError>> + Send + '_>> {
        Box::pin(async move {
            locked(&self.state.lookups).push(lookup.clone());
            if let Some(msg) = self.fault(&Fault::Lookup) {
                return Err(EngineError::Server(msg));
            }

            if let Some(items) = locked(&self.state.scripted_lookup).take() {
                return Ok(futures_util::stream::iter(items).boxed());
            }

            let candidates: BTreeSet<String> = self
                .state
                .tuples
                .iter()
                .filter(|t| t.resource.object_type == lookup.resource_type)
                .map(|t| t.resource.object_id.clone())
                .collect();

            let found: Vec<Result<String, EngineError>> = candidates
                .into_iter()
                .filter(|id| {
                    let resource = ObjectReference::new(lookup.resource_type.clone(), id.clone());
                    self.evaluate(&resource, &lookup.permission, &lookup.subject, 0)
                })
                .map(Ok)
                .collect();
            Ok(futures_util::stream::iter(found).boxed())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Consistency;

    fn check(resource: &str, permission: &str, subject: &str) -> PermissionCheck {
        PermissionCheck {
            consistency: Consistency::MinimizeLatency,
            resource: parse_object(resource),
            permission: permission.into(),
            subject: parse_object(subject).into(),
            context: None,
        }
    }

    #[tokio::test]
    async fn direct_relationship_grants() {
        let mock = MockEngine::new();
        mock.add_relationship("document:1", "viewer", "user:alice");

        let allowed = mock.check_permission(check("document:1", "viewer", "user:alice")).await;
        assert_eq!(allowed.unwrap(), Permissionship::HasPermission);

        let denied = mock.check_permission(check("document:1", "viewer", "user:bob")).await;
        assert_eq!(denied.unwrap(), Permissionship::NoPermission);
    }

    #[tokio::test]
    async fn arrow_rule_follows_tupleset() {
        let mock = MockEngine::new();
        mock.add_relationship("department:eng", "member", "user:alice");
        mock.add_relationship("agent:1", "department", "department:eng");
        mock.define_permission(
            "agent",
            "view",
            [
                PermissionRule::arrow("department", "member"),
                PermissionRule::relation("owner"),
            ],
        );

        assert!(mock.evaluate(&parse_object("agent:1"), "view", &parse_object("user:alice").into(), 0));
        assert!(!mock.evaluate(&parse_object("agent:1"), "view", &parse_object("user:bob").into(), 0));

        mock.add_relationship("agent:1", "owner", "user:bob");
        assert!(mock.evaluate(&parse_object("agent:1"), "view", &parse_object("user:bob").into(), 0));
    }

    #[tokio::test]
    async fn cyclic_rules_terminate() {
        let mock = MockEngine::new();
        mock.add_relationship("folder:a", "parent", "folder:b");
        mock.add_relationship("folder:b", "parent", "folder:a");
        mock.define_permission("folder", "view", [PermissionRule::arrow("parent", "view")]);

        assert!(!mock.evaluate(&parse_object("folder:a"), "view", &parse_object("user:x").into(), 0));
    }

    #[tokio::test]
    async fn write_touch_then_delete() {
        let mock = MockEngine::new();
        let relationship = Relationship {
            resource: parse_object("group:g1"),
            relation: "member".into(),
            subject: parse_object("user:u1").into(),
        };

        mock.write_relationships(vec![RelationshipUpdate {
            operation: UpdateOperation::Touch,
            relationship: relationship.clone(),
        }])
        .await
        .unwrap();
        assert!(mock.has_relationship("group:g1", "member", "user:u1"));

        mock.write_relationships(vec![RelationshipUpdate {
            operation: UpdateOperation::Delete,
            relationship,
        }])
        .await
        .unwrap();
        assert!(!mock.has_relationship("group:g1", "member", "user:u1"));
        assert_eq!(mock.write_requests().len(), 2);
    }
}
