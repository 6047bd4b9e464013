//! Permission queries: point check, bulk check and reverse lookup.
//!
//! Every operation resolves the subject the same way: an explicit, non-empty
//! `subjectId` in the request wins, otherwise the caller's session subject is
//! used. Without either the query fails closed with
//! `reason: "unauthenticated"` and the engine is never contacted.
//!
//! Engine failures never escape this module; they are reported through the
//! `error` field of the result.

use crate::codec::TupleCodec;
use crate::engine::{
    Consistency, Context, PermissionCheck, ResourceLookup, SharedEngine, SubjectReference,
};
use crate::error::EngineError;
use futures_util::future::join_all;
use futures_util::StreamExt;
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Reason reported when no subject could be resolved.
pub const UNAUTHENTICATED: &str = "unauthenticated";

fn default_subject_type() -> String {
    "user".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[garde(length(min = 1))]
    pub resource_type: String,
    #[garde(length(min = 1))]
    pub resource_id: String,
    #[garde(length(min = 1))]
    pub permission: String,
    #[serde(default)]
    #[garde(skip)]
    pub subject_id: Option<String>,
    #[serde(default = "default_subject_type")]
    #[garde(length(min = 1))]
    pub subject_type: String,
    #[serde(default)]
    #[garde(skip)]
    pub context: Option<Context>,
}

impl CheckRequest {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            permission: permission.into(),
            subject_id: None,
            subject_type: default_subject_type(),
            context: None,
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn with_subject_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = subject_type.into();
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn allowed(allowed: bool) -> Self {
        Self {
            allowed,
            ..Self::default()
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            reason: Some(UNAUTHENTICATED.into()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckItem {
    #[garde(length(min = 1))]
    pub resource_type: String,
    #[garde(length(min = 1))]
    pub resource_id: String,
    #[garde(length(min = 1))]
    pub permission: String,
}

impl BulkCheckItem {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            permission: permission.into(),
        }
    }
}

/// Items sharing one subject and context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckRequest {
    #[garde(dive)]
    pub checks: Vec<BulkCheckItem>,
    #[serde(default)]
    #[garde(skip)]
    pub subject_id: Option<String>,
    #[serde(default = "default_subject_type")]
    #[garde(length(min = 1))]
    pub subject_type: String,
    #[serde(default)]
    #[garde(skip)]
    pub context: Option<Context>,
}

impl BulkCheckRequest {
    pub fn new(checks: Vec<BulkCheckItem>) -> Self {
        Self {
            checks,
            subject_id: None,
            subject_type: default_subject_type(),
            context: None,
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// One bulk result, tagged with the triple it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckItemResult {
    pub resource_type: String,
    pub resource_id: String,
    pub permission: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCheckResult {
    pub results: Vec<BulkCheckItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LookupResourcesRequest {
    #[garde(length(min = 1))]
    pub resource_type: String,
    #[garde(length(min = 1))]
    pub permission: String,
    #[serde(default)]
    #[garde(skip)]
    pub subject_id: Option<String>,
    #[serde(default = "default_subject_type")]
    #[garde(length(min = 1))]
    pub subject_type: String,
    #[serde(default)]
    #[garde(skip)]
    pub context: Option<Context>,
}

impl LookupResourcesRequest {
    pub fn new(resource_type: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            permission: permission.into(),
            subject_id: None,
            subject_type: default_subject_type(),
            context: None,
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResourcesResult {
    pub resource_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answers permission queries against the engine.
#[derive(Clone)]
pub struct PermissionCoordinator {
    engine: SharedEngine,
    codec: TupleCodec,
    check_consistency: Consistency,
}

fn resolve_subject<'a>(explicit: Option<&'a str>, session: Option<&'a str>) -> Option<&'a str> {
    explicit
        .filter(|s| !s.is_empty())
        .or_else(|| session.filter(|s| !s.is_empty()))
}

impl PermissionCoordinator {
    pub fn new(engine: SharedEngine, codec: TupleCodec) -> Self {
        Self {
            engine,
            codec,
            check_consistency: Consistency::default(),
        }
    }

    /// Consistency used for point and bulk checks. Lookups always use full consistency.
    pub fn with_check_consistency(mut self, consistency: Consistency) -> Self {
        self.check_consistency = consistency;
        self
    }

    pub fn codec(&self) -> &TupleCodec {
        &self.codec
    }

    pub async fn check(&self, request: CheckRequest, session_subject: Option<&str>) -> CheckResult {
        let Some(subject_id) = resolve_subject(request.subject_id.as_deref(), session_subject)
        else {
            tracing::debug!(resource_type = %request.resource_type, "check without subject");
            return CheckResult::unauthenticated();
        };
        let subject = self.codec.subject(&request.subject_type, subject_id);

        match self
            .check_one(
                &request.resource_type,
                &request.resource_id,
                &request.permission,
                subject,
                request.context,
            )
            .await
        {
            Ok(allowed) => CheckResult::allowed(allowed),
            Err(err) => CheckResult::failed(err.to_string()),
        }
    }

    pub async fn check_bulk(
        &self,
        request: BulkCheckRequest,
        session_subject: Option<&str>,
    ) -> BulkCheckResult {
        let Some(subject_id) = resolve_subject(request.subject_id.as_deref(), session_subject)
        else {
            return BulkCheckResult {
                reason: Some(UNAUTHENTICATED.into()),
                ..BulkCheckResult::default()
            };
        };
        let subject = self.codec.subject(&request.subject_type, subject_id);
        let context = request.context;

        let checks = request.checks.into_iter().map(|item| {
            let subject = subject.clone();
            let context = context.clone();
            async move {
                let outcome = self
                    .check_one(
                        &item.resource_type,
                        &item.resource_id,
                        &item.permission,
                        subject,
                        context,
                    )
                    .await;
                let (allowed, error) = match outcome {
                    Ok(allowed) => (allowed, None),
                    Err(err) => (false, Some(err.to_string())),
                };
                BulkCheckItemResult {
                    resource_type: item.resource_type,
                    resource_id: item.resource_id,
                    permission: item.permission,
                    allowed,
                    error,
                }
            }
        });

        BulkCheckResult {
            results: join_all(checks).await,
            ..BulkCheckResult::default()
        }
    }

    pub async fn lookup_resources(
        &self,
        request: LookupResourcesRequest,
        session_subject: Option<&str>,
    ) -> LookupResourcesResult {
        let Some(subject_id) = resolve_subject(request.subject_id.as_deref(), session_subject)
        else {
            return LookupResourcesResult {
                reason: Some(UNAUTHENTICATED.into()),
                ..LookupResourcesResult::default()
            };
        };

        let lookup = ResourceLookup {
            consistency: Consistency::FullyConsistent,
            resource_type: request.resource_type,
            permission: request.permission,
            subject: self.codec.subject(&request.subject_type, subject_id),
            context: request.context,
        };

        match self.drain_lookup(lookup).await {
            Ok(resource_ids) => LookupResourcesResult {
                resource_ids,
                ..LookupResourcesResult::default()
            },
            Err(err) => {
                tracing::error!(error = %err, "resource lookup failed");
                LookupResourcesResult {
                    error: Some(err.to_string()),
                    ..LookupResourcesResult::default()
                }
            }
        }
    }

    async fn drain_lookup(&self, lookup: ResourceLookup) -> Result<Vec<String>, EngineError> {
        let mut stream = self.engine.lookup_resources(lookup).await?;
        let mut resource_ids = Vec::new();
        while let Some(item) = stream.next().await {
            resource_ids.push(self.codec.decode(&item?).to_string());
        }
        Ok(resource_ids)
    }

    async fn check_one(
        &self,
        resource_type: &str,
        resource_id: &str,
        permission: &str,
        subject: SubjectReference,
        context: Option<Context>,
    ) -> Result<bool, EngineError> {
        let check = PermissionCheck {
            consistency: self.check_consistency,
            resource: self.codec.object(resource_type, resource_id),
            permission: permission.to_string(),
            subject,
            context,
        };

        match self.engine.check_permission(check).await {
            Ok(permissionship) => {
                tracing::debug!(
                    resource_type,
                    resource_id,
                    permission,
                    ?permissionship,
                    "permission checked"
                );
                Ok(permissionship.is_allowed())
            }
            Err(err) => {
                tracing::error!(resource_type, resource_id, permission, error = %err, "permission check failed");
                Err(err)
            }
        }
    }
}
