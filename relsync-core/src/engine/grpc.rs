//! Production engine speaking the SpiceDB `PermissionsService` gRPC API.

use super::proto::permissions_service_client::PermissionsServiceClient;
use super::proto::{self, consistency::Requirement, relationship_update::Operation};
use super::{
    AuthzEngine, Consistency, Context, ObjectReference, PermissionCheck, Permissionship,
    RelationshipUpdate, ResourceIdStream, ResourceLookup, SubjectReference, UpdateOperation,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tonic::transport::{ClientTlsConfig, Endpoint};

/// gRPC engine client.
///
/// The underlying tonic channel multiplexes concurrent calls over one
/// HTTP/2 connection and is cheap to clone.
///
/// # Example
///
/// ```ignore
/// use relsync_core::{EngineConfig, GrpcEngine};
///
/// let config = EngineConfig::new("localhost:50051")
///     .with_token("somerandomkeyhere")
///     .insecure();
/// let engine = GrpcEngine::connect(&config).await?;
/// ```
#[derive(Clone)]
pub struct GrpcEngine {
    client: PermissionsServiceClient,
    token: Option<String>,
}

impl GrpcEngine {
    /// Connect to the engine using the given config.
    pub async fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let mut endpoint = Endpoint::from_shared(config.uri())
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs));

        if !config.insecure {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        }

        let channel = endpoint.connect().await?;
        tracing::info!(endpoint = %config.endpoint, insecure = config.insecure, "connected to authorization engine");

        Ok(Self {
            client: PermissionsServiceClient::new(channel),
            token: config.token.clone(),
        })
    }

    /// Build a `tonic::Request`, injecting the Bearer token if configured.
    fn make_request<T>(&self, msg: T) -> Result<tonic::Request<T>, EngineError> {
        let mut request = tonic::Request::new(msg);
        if let Some(token) = &self.token {
            request.metadata_mut().insert(
                "authorization",
                format!("Bearer {}", token)
                    .parse()
                    .map_err(|e: tonic::metadata::errors::InvalidMetadataValue| {
                        EngineError::InvalidConfig(format!("invalid token for header: {}", e))
                    })?,
            );
        }
        Ok(request)
    }
}

impl AuthzEngine for GrpcEngine {
    fn write_relationships(
        &self,
        updates: Vec<RelationshipUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + '_>> {
        let req = proto::WriteRelationshipsRequest {
            updates: updates.into_iter().map(update_to_proto).collect(),
        };

        Box::pin(async move {
            let request = self.make_request(req)?;
            self.client.clone().write_relationships(request).await?;
            Ok(())
        })
    }

    fn check_permission(
        &self,
        check: PermissionCheck,
    ) -> Pin<Box<dyn Future<Output = Result<Permissionship, EngineError>> + Send + '_>> {
        let req = proto::CheckPermissionRequest {
            consistency: Some(consistency_to_proto(check.consistency)),
            resource: Some(object_to_proto(check.resource)),
            permission: check.permission,
            subject: Some(subject_to_proto(check.subject)),
            context: check.context.map(context_to_struct),
            with_tracing: false,
        };

        Box::pin(async move {
            let request = self.make_request(req)?;
            let resp = self.client.clone().check_permission(request).await?;
            Ok(permissionship_from_proto(resp.into_inner().permissionship))
        })
    }

    fn lookup_resources(
        &self,
        lookup: ResourceLookup,
    ) -> Pin<Box<dyn Future<Output = Result<ResourceIdStream, EngineError>> + Send + '_>> {
        let req = proto::LookupResourcesRequest {
            consistency: Some(consistency_to_proto(lookup.consistency)),
            resource_object_type: lookup.resource_type,
            permission: lookup.permission,
            subject: Some(subject_to_proto(lookup.subject)),
            context: lookup.context.map(context_to_struct),
            optional_limit: 0,
            optional_cursor: None,
        };

        Box::pin(async move {
            let request = self.make_request(req)?;
            let resp = self.client.clone().lookup_resources(request).await?;
            let stream = resp
                .into_inner()
                .filter_map(|item| async move {
                    match item {
                        Ok(found) if is_definite(found.permissionship) => {
                            Some(Ok(found.resource_object_id))
                        }
                        Ok(found) => {
                            tracing::debug!(
                                resource_id = %found.resource_object_id,
                                "skipping conditional lookup result"
                            );
                            None
                        }
                        Err(status) => Some(Err(EngineError::Stream(status.message().to_string()))),
                    }
                })
                .boxed();
            Ok(stream)
        })
    }
}

fn is_definite(permissionship: i32) -> bool {
    permissionship == proto::LookupPermissionship::HasPermission as i32
}

fn object_to_proto(object: ObjectReference) -> proto::ObjectReference {
    proto::ObjectReference {
        object_type: object.object_type,
        object_id: object.object_id,
    }
}

fn subject_to_proto(subject: SubjectReference) -> proto::SubjectReference {
    proto::SubjectReference {
        object: Some(object_to_proto(subject.object)),
        optional_relation: subject.optional_relation.unwrap_or_default(),
    }
}

fn update_to_proto(update: RelationshipUpdate) -> proto::RelationshipUpdate {
    let operation = match update.operation {
        UpdateOperation::Touch => Operation::Touch,
        UpdateOperation::Delete => Operation::Delete,
    };
    let relationship = update.relationship;
    proto::RelationshipUpdate {
        operation: operation as i32,
        relationship: Some(proto::Relationship {
            resource: Some(object_to_proto(relationship.resource)),
            relation: relationship.relation,
            subject: Some(subject_to_proto(relationship.subject)),
        }),
    }
}

fn consistency_to_proto(consistency: Consistency) -> proto::Consistency {
    let requirement = match consistency {
        Consistency::MinimizeLatency => Requirement::MinimizeLatency(true),
        Consistency::FullyConsistent => Requirement::FullyConsistent(true),
    };
    proto::Consistency {
        requirement: Some(requirement),
    }
}

fn permissionship_from_proto(value: i32) -> Permissionship {
    use proto::CheckPermissionResponsePermissionship as Wire;
    match Wire::try_from(value) {
        Ok(Wire::HasPermission) => Permissionship::HasPermission,
        Ok(Wire::NoPermission) => Permissionship::NoPermission,
        Ok(Wire::ConditionalPermission) => Permissionship::Conditional,
        Ok(Wire::Unspecified) | Err(_) => Permissionship::Unspecified,
    }
}

fn context_to_struct(context: Context) -> prost_types::Struct {
    prost_types::Struct {
        fields: context
            .into_iter()
            .map(|(key, value)| (key, json_to_value(value)))
            .collect(),
    }
}

fn json_to_value(value: serde_json::Value) -> prost_types::Value {
    use prost_types::value::Kind;
    let kind = match value {
        serde_json::Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.into_iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(context_to_struct(map)),
    };
    prost_types::Value { kind: Some(kind) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::value::Kind;

    #[test]
    fn touch_and_delete_map_to_wire_operations() {
        let update = RelationshipUpdate {
            operation: UpdateOperation::Touch,
            relationship: super::super::Relationship {
                resource: ObjectReference::new("agent", "1"),
                relation: "owner".into(),
                subject: ObjectReference::new("user", "alice").into(),
            },
        };
        let wire = update_to_proto(update.clone());
        assert_eq!(wire.operation, Operation::Touch as i32);
        assert_eq!(wire.operation, 2);

        let wire = update_to_proto(RelationshipUpdate {
            operation: UpdateOperation::Delete,
            ..update
        });
        assert_eq!(wire.operation, 3);
        let relationship = wire.relationship.unwrap();
        assert_eq!(relationship.resource.unwrap().object_id, "1");
        assert_eq!(relationship.subject.unwrap().optional_relation, "");
    }

    #[test]
    fn only_has_permission_is_allowed() {
        assert!(permissionship_from_proto(2).is_allowed());
        assert!(!permissionship_from_proto(1).is_allowed());
        assert!(!permissionship_from_proto(3).is_allowed());
        assert!(!permissionship_from_proto(0).is_allowed());
        assert!(!permissionship_from_proto(42).is_allowed());
    }

    #[test]
    fn consistency_requirement() {
        assert_eq!(
            consistency_to_proto(Consistency::FullyConsistent).requirement,
            Some(Requirement::FullyConsistent(true))
        );
        assert_eq!(
            consistency_to_proto(Consistency::MinimizeLatency).requirement,
            Some(Requirement::MinimizeLatency(true))
        );
    }

    #[test]
    fn context_converts_nested_json() {
        let context = serde_json::json!({
            "ip": "10.0.0.1",
            "attempts": 3,
            "flags": [true, null],
            "meta": {"tier": "gold"}
        });
        let serde_json::Value::Object(map) = context else {
            unreachable!()
        };
        let wire = context_to_struct(map);

        assert_eq!(
            wire.fields["ip"].kind,
            Some(Kind::StringValue("10.0.0.1".into()))
        );
        assert_eq!(wire.fields["attempts"].kind, Some(Kind::NumberValue(3.0)));
        match &wire.fields["flags"].kind {
            Some(Kind::ListValue(list)) => {
                assert_eq!(list.values[0].kind, Some(Kind::BoolValue(true)));
                assert_eq!(list.values[1].kind, Some(Kind::NullValue(0)));
            }
            other => panic!("expected list, got {other:?}"),
        }
        match &wire.fields["meta"].kind {
            Some(Kind::StructValue(meta)) => {
                assert_eq!(meta.fields["tier"].kind, Some(Kind::StringValue("gold".into())));
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
