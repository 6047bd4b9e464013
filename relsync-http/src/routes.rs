use crate::dto::{EmitRequest, MutationResult, RelationshipRequest};
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::session::{Caller, Privileged, SharedSessionResolver};
use axum::extract::{FromRef, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http::StatusCode;
use relsync_core::{
    BulkCheckRequest, BulkCheckResult, CheckRequest, CheckResult, DispatchSummary,
    EventDispatcher, LookupResourcesRequest, LookupResourcesResult, PermissionCoordinator,
    RelationshipWriter, SyncError,
};
use relsync_core::engine::UpdateOperation;

pub const CHECK_PATH: &str = "/authz/check";
pub const CHECK_BULK_PATH: &str = "/authz/check-bulk";
pub const LOOKUP_RESOURCES_PATH: &str = "/authz/lookup-resources";
pub const WRITE_RELATIONSHIP_PATH: &str = "/authz/write-relationship";
pub const DELETE_RELATIONSHIP_PATH: &str = "/authz/delete-relationship";
pub const EVENTS_PATH: &str = "/authz/events";

/// Shared state of the authz router.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: PermissionCoordinator,
    pub writer: RelationshipWriter,
    pub dispatcher: EventDispatcher,
    pub sessions: SharedSessionResolver,
    /// Accept read queries without a session when they name a subject.
    pub allow_anonymous_subject: bool,
}

impl FromRef<AppState> for SharedSessionResolver {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Build the `/authz/*` router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHECK_PATH, post(check))
        .route(CHECK_BULK_PATH, post(check_bulk))
        .route(LOOKUP_RESOURCES_PATH, post(lookup_resources))
        .route(WRITE_RELATIONSHIP_PATH, post(write_relationship))
        .route(DELETE_RELATIONSHIP_PATH, post(delete_relationship))
        .route(EVENTS_PATH, post(emit_event))
        .with_state(state)
}

/// Subject context for a read query, or `None` when the query must be
/// answered as unauthenticated. Rejected credentials fail closed the same
/// way as a missing session.
fn reader(state: &AppState, caller: Result<Caller, ApiError>) -> Option<Caller> {
    match caller {
        Ok(caller) if caller.0.is_some() || state.allow_anonymous_subject => Some(caller),
        Ok(_) => {
            tracing::warn!("read query without session");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "read query with rejected credentials");
            None
        }
    }
}

fn status_for(reason: &Option<String>, error: &Option<String>) -> StatusCode {
    if reason.is_some() {
        StatusCode::UNAUTHORIZED
    } else if error.is_some() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn check(
    State(state): State<AppState>,
    caller: Result<Caller, ApiError>,
    body: Result<ValidJson<CheckRequest>, ApiError>,
) -> Response {
    let Some(caller) = reader(&state, caller) else {
        return (StatusCode::UNAUTHORIZED, Json(CheckResult::unauthenticated())).into_response();
    };
    let ValidJson(request) = match body {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };

    let result = state.coordinator.check(request, caller.subject_id()).await;
    (status_for(&result.reason, &result.error), Json(result)).into_response()
}

async fn check_bulk(
    State(state): State<AppState>,
    caller: Result<Caller, ApiError>,
    body: Result<ValidJson<BulkCheckRequest>, ApiError>,
) -> Response {
    let Some(caller) = reader(&state, caller) else {
        let result = BulkCheckResult {
            reason: Some(relsync_core::UNAUTHENTICATED.into()),
            ..BulkCheckResult::default()
        };
        return (StatusCode::UNAUTHORIZED, Json(result)).into_response();
    };
    let ValidJson(request) = match body {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };

    let result = state.coordinator.check_bulk(request, caller.subject_id()).await;
    (status_for(&result.reason, &result.error), Json(result)).into_response()
}

async fn lookup_resources(
    State(state): State<AppState>,
    caller: Result<Caller, ApiError>,
    body: Result<ValidJson<LookupResourcesRequest>, ApiError>,
) -> Response {
    let Some(caller) = reader(&state, caller) else {
        let result = LookupResourcesResult {
            reason: Some(relsync_core::UNAUTHENTICATED.into()),
            ..LookupResourcesResult::default()
        };
        return (StatusCode::UNAUTHORIZED, Json(result)).into_response();
    };
    let ValidJson(request) = match body {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };

    let result = state
        .coordinator
        .lookup_resources(request, caller.subject_id())
        .await;
    (status_for(&result.reason, &result.error), Json(result)).into_response()
}

async fn mutate(
    state: &AppState,
    operation: UpdateOperation,
    request: RelationshipRequest,
) -> (StatusCode, Json<MutationResult>) {
    let outcome = state
        .writer
        .apply(operation, &request.resource, &request.relation, &request.subject)
        .await;
    match outcome {
        Ok(()) => (StatusCode::OK, Json(MutationResult::ok())),
        Err(err @ SyncError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, Json(MutationResult::failed(err.to_string())))
        }
        Err(err) => {
            tracing::error!(operation = operation.as_str(), error = %err, "relationship mutation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MutationResult::failed(err.to_string())),
            )
        }
    }
}

async fn write_relationship(
    State(state): State<AppState>,
    Privileged(session): Privileged,
    ValidJson(request): ValidJson<RelationshipRequest>,
) -> (StatusCode, Json<MutationResult>) {
    tracing::debug!(sub = %session.subject_id, "write relationship");
    mutate(&state, UpdateOperation::Touch, request).await
}

async fn delete_relationship(
    State(state): State<AppState>,
    Privileged(session): Privileged,
    ValidJson(request): ValidJson<RelationshipRequest>,
) -> (StatusCode, Json<MutationResult>) {
    tracing::debug!(sub = %session.subject_id, "delete relationship");
    mutate(&state, UpdateOperation::Delete, request).await
}

async fn emit_event(
    State(state): State<AppState>,
    Privileged(session): Privileged,
    ValidJson(request): ValidJson<EmitRequest>,
) -> Json<DispatchSummary> {
    tracing::debug!(sub = %session.subject_id, event = %request.event, "emit event");
    Json(state.dispatcher.emit(&request.event, request.payload).await)
}
