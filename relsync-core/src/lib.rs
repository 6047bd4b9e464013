//! Event-driven relationship sync and permission queries for a
//! SpiceDB-protocol ReBAC engine.
//!
//! # Overview
//!
//! Application code emits domain events ("agent created", "user joined
//! group"); declarative mappings turn them into relationship tuples which
//! are written to or removed from the engine. Independently, the
//! [`PermissionCoordinator`] answers point checks, bulk checks and reverse
//! lookups against the same engine.
//!
//! ```text
//! emit(event, payload) ─► EventDispatcher ─► MappingRegistry handlers
//!                                                │
//!                                                ▼
//!                       RelationshipWriter ─► TupleCodec ─► AuthzEngine
//!                                                               ▲
//! check / check_bulk / lookup ─► PermissionCoordinator ─────────┘
//! ```
//!
//! # Setup
//!
//! ```ignore
//! use relsync_core::prelude::*;
//! use std::sync::Arc;
//!
//! let engine: SharedEngine = Arc::new(
//!     GrpcEngine::connect(&EngineConfig::new("localhost:50051").insecure()).await?,
//! );
//! let codec = TupleCodec::with_namespace("tenant1_");
//!
//! let mut registry = MappingRegistry::new(RelationshipWriter::new(engine.clone(), codec.clone()));
//! registry
//!     .register_builtins(&GroupSyncConfig::enabled())
//!     .register(
//!         RelationshipMapping::new("agent.created", "owner")
//!             .resource("agent", Extractor::pointer("/agent/id"))
//!             .subject("user", Extractor::pointer("/userId")),
//!     );
//! let dispatcher = EventDispatcher::new(registry);
//!
//! dispatcher
//!     .emit("agent.created", serde_json::json!({"agent": {"id": "a1"}, "userId": "alice"}))
//!     .await;
//!
//! let coordinator = PermissionCoordinator::new(engine, codec);
//! let result = coordinator
//!     .check(CheckRequest::new("agent", "a1", "view"), Some("alice"))
//!     .await;
//! ```
//!
//! # Testing
//!
//! [`MockEngine`] keeps tuples in memory and evaluates simple permission
//! rules, so whole flows can be exercised without an engine:
//!
//! ```ignore
//! let mock = MockEngine::new();
//! mock.define_permission("agent", "view", [PermissionRule::relation("owner")]);
//! let engine: SharedEngine = Arc::new(mock.clone());
//! ```

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod registry;
pub mod writer;

pub use codec::{ObjectRef, TupleCodec};
pub use config::{EngineConfig, GroupSyncConfig, SyncConfig};
pub use coordinator::{
    BulkCheckItem, BulkCheckItemResult, BulkCheckRequest, BulkCheckResult, CheckRequest,
    CheckResult, LookupResourcesRequest, LookupResourcesResult, PermissionCoordinator,
    UNAUTHENTICATED,
};
pub use dispatcher::{DispatchSummary, EventDispatcher};
pub use engine::{
    AuthzEngine, Consistency, Context, GrpcEngine, MockEngine, PermissionRule, Permissionship,
    SharedEngine,
};
pub use error::{EngineError, SyncError};
pub use mapping::{Extractor, MappingAction, MappingDeclaration, Payload, RelationshipMapping};
pub use registry::{Handler, HandlerOutcome, MappingRegistry};
pub use writer::RelationshipWriter;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::codec::{ObjectRef, TupleCodec};
    pub use crate::config::{EngineConfig, GroupSyncConfig, SyncConfig};
    pub use crate::coordinator::{
        BulkCheckItem, BulkCheckRequest, CheckRequest, LookupResourcesRequest,
        PermissionCoordinator,
    };
    pub use crate::dispatcher::EventDispatcher;
    pub use crate::engine::{AuthzEngine, GrpcEngine, MockEngine, PermissionRule, SharedEngine};
    pub use crate::error::{EngineError, SyncError};
    pub use crate::mapping::{Extractor, RelationshipMapping};
    pub use crate::registry::{HandlerOutcome, MappingRegistry};
    pub use crate::writer::RelationshipWriter;
}
