//! Tuple codec: namespacing of object IDs and construction of wire shapes.
//!
//! Several tenants can share one engine by prefixing every object ID with a
//! tenant namespace. Encoding prepends the prefix; decoding strips it only
//! when present, so IDs written before namespacing was enabled still read
//! back unchanged.

use crate::engine::{
    ObjectReference, Relationship, RelationshipUpdate, SubjectReference, UpdateOperation,
};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// A raw (un-namespaced) `type:id` pair as seen by application code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct ObjectRef {
    #[serde(rename = "type")]
    #[garde(length(min = 1))]
    pub object_type: String,
    #[garde(length(min = 1))]
    pub id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.object_type, self.id)
    }
}

/// Applies and strips the namespace prefix, and builds engine requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleCodec {
    namespace: Option<String>,
}

impl TupleCodec {
    /// Codec without namespacing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec prefixing every ID with `namespace`. An empty prefix disables namespacing.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: (!namespace.is_empty()).then_some(namespace),
        }
    }

    pub fn from_config(namespace: Option<&str>) -> Self {
        namespace.map(Self::with_namespace).unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn encode(&self, raw_id: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}{raw_id}"),
            None => raw_id.to_string(),
        }
    }

    pub fn decode<'a>(&self, wire_id: &'a str) -> &'a str {
        match &self.namespace {
            Some(ns) => wire_id.strip_prefix(ns.as_str()).unwrap_or(wire_id),
            None => wire_id,
        }
    }

    pub fn object(&self, object_type: &str, raw_id: &str) -> ObjectReference {
        ObjectReference::new(object_type, self.encode(raw_id))
    }

    pub fn subject(&self, object_type: &str, raw_id: &str) -> SubjectReference {
        self.object(object_type, raw_id).into()
    }

    pub fn relationship(
        &self,
        resource: &ObjectRef,
        relation: &str,
        subject: &ObjectRef,
    ) -> Relationship {
        Relationship {
            resource: self.object(&resource.object_type, &resource.id),
            relation: relation.to_string(),
            subject: self.subject(&subject.object_type, &subject.id),
        }
    }

    pub fn update(
        &self,
        operation: UpdateOperation,
        resource: &ObjectRef,
        relation: &str,
        subject: &ObjectRef,
    ) -> RelationshipUpdate {
        RelationshipUpdate {
            operation,
            relationship: self.relationship(resource, relation, subject),
        }
    }
}
