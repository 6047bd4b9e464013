//! Request and response bodies owned by the boundary.
//!
//! Query bodies (`CheckRequest`, `BulkCheckRequest`, ...) are the core types
//! themselves and are re-exported from the crate root.

use garde::Validate;
use relsync_core::ObjectRef;
use serde::{Deserialize, Serialize};

/// Body of `writeRelationship` / `deleteRelationship`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RelationshipRequest {
    #[garde(dive)]
    pub resource: ObjectRef,
    #[garde(length(min = 1))]
    pub relation: String,
    #[garde(dive)]
    pub subject: ObjectRef,
}

impl RelationshipRequest {
    pub fn new(resource: ObjectRef, relation: impl Into<String>, subject: ObjectRef) -> Self {
        Self {
            resource,
            relation: relation.into(),
            subject,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Body of the event emission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EmitRequest {
    #[garde(length(min = 1))]
    pub event: String,
    #[serde(default)]
    #[garde(skip)]
    pub payload: serde_json::Value,
}
