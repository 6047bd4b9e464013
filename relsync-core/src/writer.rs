//! Single-relationship TOUCH and DELETE against the engine.

use crate::codec::{ObjectRef, TupleCodec};
use crate::engine::{SharedEngine, UpdateOperation};
use crate::error::SyncError;

/// Writes or removes single relationships.
///
/// Each call is one `WriteRelationships` batch containing exactly one
/// update. Failures are returned to the caller; nothing is retried.
#[derive(Clone)]
pub struct RelationshipWriter {
    engine: SharedEngine,
    codec: TupleCodec,
}

impl RelationshipWriter {
    pub fn new(engine: SharedEngine, codec: TupleCodec) -> Self {
        Self { engine, codec }
    }

    pub fn codec(&self) -> &TupleCodec {
        &self.codec
    }

    /// Upsert `resource#relation@subject` (TOUCH).
    pub async fn write(
        &self,
        resource: &ObjectRef,
        relation: &str,
        subject: &ObjectRef,
    ) -> Result<(), SyncError> {
        self.apply(UpdateOperation::Touch, resource, relation, subject).await
    }

    /// Remove `resource#relation@subject` (DELETE). Removing a missing
    /// relationship succeeds.
    pub async fn remove(
        &self,
        resource: &ObjectRef,
        relation: &str,
        subject: &ObjectRef,
    ) -> Result<(), SyncError> {
        self.apply(UpdateOperation::Delete, resource, relation, subject).await
    }

    pub async fn apply(
        &self,
        operation: UpdateOperation,
        resource: &ObjectRef,
        relation: &str,
        subject: &ObjectRef,
    ) -> Result<(), SyncError> {
        validate(resource, relation, subject)?;

        let update = self.codec.update(operation, resource, relation, subject);
        let tuple = &update.relationship;
        tracing::debug!(
            operation = operation.as_str(),
            resource = %format_args!("{}:{}", tuple.resource.object_type, tuple.resource.object_id),
            relation = %tuple.relation,
            subject = %format_args!("{}:{}", tuple.subject.object.object_type, tuple.subject.object.object_id),
            "writing relationship"
        );

        self.engine.write_relationships(vec![update]).await?;
        Ok(())
    }
}

fn validate(resource: &ObjectRef, relation: &str, subject: &ObjectRef) -> Result<(), SyncError> {
    let fields = [
        ("resource type", resource.object_type.as_str()),
        ("resource id", resource.id.as_str()),
        ("relation", relation),
        ("subject type", subject.object_type.as_str()),
        ("subject id", subject.id.as_str()),
    ];
    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(SyncError::Validation(format!("{} must not be empty", name))),
        None => Ok(()),
    }
}
