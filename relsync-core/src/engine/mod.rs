//! Engine trait and the request model shared by every engine implementation.
//!
//! [`AuthzEngine`] is the seam between this crate and the remote
//! relationship-graph engine. Values crossing it are already namespaced:
//! the [`TupleCodec`](crate::codec::TupleCodec) runs before a request is
//! built and after a lookup result comes back.
//!
//! Provided implementations:
//! - [`GrpcEngine`]: SpiceDB-protocol gRPC client
//! - [`MockEngine`]: in-memory engine with rule evaluation for tests

pub mod grpc;
pub mod mock;
pub mod proto;

pub use grpc::GrpcEngine;
pub use mock::{MockEngine, PermissionRule};

use crate::error::EngineError;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Structured caveat context, passed through to the engine untouched.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Stream of (namespaced) resource IDs produced by a reverse lookup.
pub type ResourceIdStream = BoxStream<'static, Result<String, EngineError>>;

/// Engine handle shared by the writer and the coordinator.
pub type SharedEngine = Arc<dyn AuthzEngine>;

/// A typed object in the permission graph (`type:id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectReference {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

/// Subject of a relationship, optionally a subject set (`group:eng#member`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectReference {
    pub object: ObjectReference,
    pub optional_relation: Option<String>,
}

impl From<ObjectReference> for SubjectReference {
    fn from(object: ObjectReference) -> Self {
        Self {
            object,
            optional_relation: None,
        }
    }
}

/// `resource#relation@subject`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub resource: ObjectReference,
    pub relation: String,
    pub subject: SubjectReference,
}

/// Mutation applied by a relationship update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperation {
    /// Idempotent upsert.
    Touch,
    /// Idempotent removal.
    Delete,
}

impl UpdateOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOperation::Touch => "touch",
            UpdateOperation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipUpdate {
    pub operation: UpdateOperation,
    pub relationship: Relationship,
}

/// Read consistency requested from the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Let the engine pick the fastest snapshot (may be slightly stale).
    #[default]
    MinimizeLatency,
    /// Observe every write completed before the request.
    FullyConsistent,
}

/// Tri-state (plus unspecified) answer of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissionship {
    Unspecified,
    NoPermission,
    HasPermission,
    /// Caveated: the answer depends on context that was not supplied.
    Conditional,
}

impl Permissionship {
    /// Only an explicit affirmative counts as allowed.
    pub fn is_allowed(self) -> bool {
        matches!(self, Permissionship::HasPermission)
    }
}

/// A single permission check as sent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionCheck {
    pub consistency: Consistency,
    pub resource: ObjectReference,
    pub permission: String,
    pub subject: SubjectReference,
    pub context: Option<Context>,
}

/// A reverse lookup as sent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLookup {
    pub consistency: Consistency,
    pub resource_type: String,
    pub permission: String,
    pub subject: SubjectReference,
    pub context: Option<Context>,
}

/// Remote relationship-graph engine.
///
/// Implementations must be safe for concurrent use: one instance serves
/// every request and event of the process.
pub trait AuthzEngine: Send + Sync + 'static {
    /// Apply a batch of relationship updates atomically.
    fn write_relationships(
        &self,
        updates: Vec<RelationshipUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + '_>>;

    /// Evaluate one permission.
    fn check_permission(
        &self,
        check: PermissionCheck,
    ) -> Pin<Box<dyn Future<Output = Result<Permissionship, EngineError>> + Send + '_>>;

    /// Open a stream of resource IDs the subject holds the permission on.
    fn lookup_resources(
        &self,
        lookup: ResourceLookup,
    ) -> Pin<Box<dyn Future<Output = Result<ResourceIdStream, EngineError>> + Send + '_>>;
}
