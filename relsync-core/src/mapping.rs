//! Declarative event-to-relationship mappings.

use crate::engine::UpdateOperation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Event payload as delivered to mappings and handlers.
pub type Payload = serde_json::Value;

/// Pulls an identifier out of an event payload.
///
/// An extractor returning `None` (or an empty string) means the event does
/// not carry enough information and the mapping is skipped.
#[derive(Clone)]
pub struct Extractor(Arc<dyn Fn(&Payload) -> Option<String> + Send + Sync>);

impl Extractor {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Payload) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Read a JSON pointer (`/agent/id`). String and number leaves are accepted.
    pub fn pointer(pointer: impl Into<String>) -> Self {
        let pointer = pointer.into();
        Self::from_fn(move |payload| match payload.pointer(&pointer)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Always yield the same id.
    pub fn constant(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::from_fn(move |_| Some(value.clone()))
    }

    pub fn extract(&self, payload: &Payload) -> Option<String> {
        (self.0)(payload).filter(|id| !id.is_empty())
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Extractor(..)")
    }
}

/// Turns one kind of event into one relationship.
///
/// # Example
///
/// ```
/// use relsync_core::{Extractor, RelationshipMapping};
///
/// let mapping = RelationshipMapping::new("agent.created", "owner")
///     .resource("agent", Extractor::pointer("/agent/id"))
///     .subject("user", Extractor::pointer("/userId"));
/// assert_eq!(mapping.event_name, "agent.created");
/// ```
#[derive(Debug, Clone)]
pub struct RelationshipMapping {
    pub event_name: String,
    pub resource_type: String,
    pub relation: String,
    pub subject_type: String,
    pub resource_id: Extractor,
    pub subject_id: Extractor,
}

impl RelationshipMapping {
    /// Start a mapping. Resource and subject default to empty types and
    /// extractors yielding nothing, so both must be set.
    pub fn new(event_name: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            resource_type: String::new(),
            relation: relation.into(),
            subject_type: String::new(),
            resource_id: Extractor::from_fn(|_| None),
            subject_id: Extractor::from_fn(|_| None),
        }
    }

    pub fn resource(mut self, resource_type: impl Into<String>, id: Extractor) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = id;
        self
    }

    pub fn subject(mut self, subject_type: impl Into<String>, id: Extractor) -> Self {
        self.subject_type = subject_type.into();
        self.subject_id = id;
        self
    }
}

/// Whether a configured mapping writes or removes its relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingAction {
    #[default]
    Touch,
    Delete,
}

impl From<MappingAction> for UpdateOperation {
    fn from(action: MappingAction) -> Self {
        match action {
            MappingAction::Touch => UpdateOperation::Touch,
            MappingAction::Delete => UpdateOperation::Delete,
        }
    }
}

/// Mapping declared in configuration, with ids read by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDeclaration {
    pub event: String,
    pub resource_type: String,
    pub resource_id: String,
    pub relation: String,
    pub subject_type: String,
    pub subject_id: String,
    #[serde(default)]
    pub action: MappingAction,
}

impl MappingDeclaration {
    pub fn to_mapping(&self) -> RelationshipMapping {
        RelationshipMapping::new(&self.event, &self.relation)
            .resource(&self.resource_type, Extractor::pointer(&self.resource_id))
            .subject(&self.subject_type, Extractor::pointer(&self.subject_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_accepts_strings_and_numbers() {
        let payload = json!({"agent": {"id": "a1"}, "userId": 42, "flag": true});
        assert_eq!(Extractor::pointer("/agent/id").extract(&payload).as_deref(), Some("a1"));
        assert_eq!(Extractor::pointer("/userId").extract(&payload).as_deref(), Some("42"));
        assert_eq!(Extractor::pointer("/flag").extract(&payload), None);
        assert_eq!(Extractor::pointer("/missing").extract(&payload), None);
    }

    #[test]
    fn empty_ids_are_treated_as_missing() {
        let payload = json!({"groupId": ""});
        assert_eq!(Extractor::pointer("/groupId").extract(&payload), None);
        assert_eq!(Extractor::constant("").extract(&payload), None);
    }

    #[test]
    fn declaration_defaults_to_touch() {
        let decl: MappingDeclaration = serde_json::from_value(json!({
            "event": "agent.created",
            "resource_type": "agent",
            "resource_id": "/agent/id",
            "relation": "owner",
            "subject_type": "user",
            "subject_id": "/userId"
        }))
        .unwrap();
        assert_eq!(decl.action, MappingAction::Touch);

        let mapping = decl.to_mapping();
        let payload = json!({"agent": {"id": "a1"}, "userId": "alice"});
        assert_eq!(mapping.resource_type, "agent");
        assert_eq!(mapping.resource_id.extract(&payload).as_deref(), Some("a1"));
        assert_eq!(mapping.subject_id.extract(&payload).as_deref(), Some("alice"));
    }

    #[test]
    fn unset_sides_extract_nothing() {
        let mapping = RelationshipMapping::new("x", "owner");
        assert_eq!(mapping.resource_id.extract(&json!({})), None);
    }
}
