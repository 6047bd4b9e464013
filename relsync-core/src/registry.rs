//! Event name to handler table.
//!
//! The registry is filled during startup through `&mut self` methods and then
//! frozen behind an `Arc` inside the [`EventDispatcher`](crate::EventDispatcher).
//! Registering under an existing event name appends, so every mapping
//! registered for an event fires.

use crate::codec::ObjectRef;
use crate::config::GroupSyncConfig;
use crate::engine::UpdateOperation;
use crate::error::SyncError;
use crate::mapping::{Extractor, MappingDeclaration, Payload, RelationshipMapping};
use crate::writer::RelationshipWriter;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

pub const GROUP_MEMBER_ADDED: &str = "group.memberAdded";
pub const GROUP_MEMBER_REMOVED: &str = "group.memberRemoved";
pub const MEMBER_RELATION: &str = "member";

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The relationship was written or removed.
    Synced,
    /// The payload did not carry the required ids.
    Skipped(String),
}

pub type HandlerFuture = BoxFuture<'static, Result<HandlerOutcome, SyncError>>;

/// Type-erased async event handler.
pub type Handler = Arc<dyn Fn(Arc<Payload>) -> HandlerFuture + Send + Sync>;

pub struct MappingRegistry {
    writer: RelationshipWriter,
    handlers: HashMap<String, Vec<Handler>>,
}

impl MappingRegistry {
    pub fn new(writer: RelationshipWriter) -> Self {
        Self {
            writer,
            handlers: HashMap::new(),
        }
    }

    pub fn writer(&self) -> &RelationshipWriter {
        &self.writer
    }

    /// Install group membership sync when enabled.
    ///
    /// `group.memberAdded` writes and `group.memberRemoved` removes
    /// `group:<groupId>#member@user:<userId>`.
    pub fn register_builtins(&mut self, config: &GroupSyncConfig) -> &mut Self {
        if !config.enabled {
            return self;
        }
        let mapping = |event: &str| {
            RelationshipMapping::new(event, MEMBER_RELATION)
                .resource(&config.resource_type, Extractor::pointer(&config.group_id_pointer))
                .subject(&config.subject_type, Extractor::pointer(&config.user_id_pointer))
        };
        self.register(mapping(GROUP_MEMBER_ADDED));
        self.register_removal(mapping(GROUP_MEMBER_REMOVED));
        self
    }

    /// Write the mapped relationship whenever the event fires.
    pub fn register(&mut self, mapping: RelationshipMapping) -> &mut Self {
        self.register_mapping(UpdateOperation::Touch, mapping)
    }

    /// Remove the mapped relationship whenever the event fires.
    pub fn register_removal(&mut self, mapping: RelationshipMapping) -> &mut Self {
        self.register_mapping(UpdateOperation::Delete, mapping)
    }

    pub fn register_declaration(&mut self, declaration: &MappingDeclaration) -> &mut Self {
        self.register_mapping(declaration.action.into(), declaration.to_mapping())
    }

    /// Install an arbitrary async handler.
    pub fn register_handler<F, Fut>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Arc<Payload>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome, SyncError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |payload: Arc<Payload>| -> HandlerFuture {
            Box::pin(handler(payload))
        });
        self.insert(event.into(), handler)
    }

    fn register_mapping(
        &mut self,
        operation: UpdateOperation,
        mapping: RelationshipMapping,
    ) -> &mut Self {
        let event = mapping.event_name.clone();
        let writer = self.writer.clone();
        let mapping = Arc::new(mapping);

        let handler: Handler = Arc::new(move |payload: Arc<Payload>| -> HandlerFuture {
            let writer = writer.clone();
            let mapping = mapping.clone();
            Box::pin(async move { run_mapping(&writer, operation, &mapping, &payload).await })
        });
        tracing::debug!(event = %event, operation = operation.as_str(), "registered relationship mapping");
        self.insert(event, handler)
    }

    fn insert(&mut self, event: String, handler: Handler) -> &mut Self {
        self.handlers.entry(event).or_default().push(handler);
        self
    }

    /// Handlers for `event` in registration order. Empty for unknown events.
    pub fn handlers_for(&self, event: &str) -> &[Handler] {
        self.handlers.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers_for(event).len()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn run_mapping(
    writer: &RelationshipWriter,
    operation: UpdateOperation,
    mapping: &RelationshipMapping,
    payload: &Payload,
) -> Result<HandlerOutcome, SyncError> {
    let resource_id = mapping.resource_id.extract(payload);
    let subject_id = mapping.subject_id.extract(payload);
    let (Some(resource_id), Some(subject_id)) = (resource_id, subject_id) else {
        return Ok(HandlerOutcome::Skipped(format!(
            "missing {} or {} id for relation '{}'",
            mapping.resource_type, mapping.subject_type, mapping.relation
        )));
    };

    writer
        .apply(
            operation,
            &ObjectRef::new(&mapping.resource_type, resource_id),
            &mapping.relation,
            &ObjectRef::new(&mapping.subject_type, subject_id),
        )
        .await?;
    Ok(HandlerOutcome::Synced)
}
