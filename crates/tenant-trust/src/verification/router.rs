use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::consent::{ConsentPermissions, DataRetention};
use super::details::VerificationDetails;
use super::directory::TenantDirectory;
use super::domain::{DeclineReason, ReferenceId, ReferenceProvider, ReferenceType, TenantId};
use super::notify::NotificationGateway;
use super::repository::{ConsentRepository, ReferenceRepository};
use super::service::{VerificationError, VerificationService};

/// Router builder exposing the verification operations over HTTP.
///
/// Tenant-facing endpoints address records by id; referee-facing endpoints
/// are addressed purely by token and answer every guard miss with the same
/// generic not-found body.
pub fn verification_router<R, C, T, N>(
    service: Arc<VerificationService<R, C, T, N>>,
) -> Router
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/verification/consents",
            post(create_consent_handler::<R, C, T, N>),
        )
        .route(
            "/api/v1/verification/references",
            post(request_reference_handler::<R, C, T, N>),
        )
        .route(
            "/api/v1/verification/references/:reference_id/resend",
            post(resend_reference_handler::<R, C, T, N>),
        )
        .route(
            "/api/v1/verification/providers/:token/respond",
            post(respond_reference_handler::<R, C, T, N>),
        )
        .route(
            "/api/v1/verification/providers/:token/decline",
            post(decline_reference_handler::<R, C, T, N>),
        )
        .route(
            "/api/v1/verification/tenants/:tenant_id/references",
            get(list_references_handler::<R, C, T, N>),
        )
        .route(
            "/api/v1/verification/tenants/:tenant_id/score",
            post(verify_tenant_handler::<R, C, T, N>),
        )
        .with_state(service)
}

fn error_response(error: VerificationError) -> Response {
    let status = match &error {
        VerificationError::TenantNotFound(_) | VerificationError::RequestNotFound => {
            StatusCode::NOT_FOUND
        }
        VerificationError::NotPending { .. } | VerificationError::NoCompletedReferences => {
            StatusCode::CONFLICT
        }
        VerificationError::Expired => StatusCode::GONE,
        VerificationError::AttemptsExhausted { .. }
        | VerificationError::ResendCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
        VerificationError::InvalidRating(_)
        | VerificationError::InvalidDetails(_)
        | VerificationError::RetentionOutOfRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationError::Repository(_) | VerificationError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let body = axum::Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateConsentBody {
    tenant_id: String,
    requester_id: String,
    #[serde(default)]
    permissions: Option<ConsentPermissions>,
    #[serde(default)]
    data_retention: Option<DataRetention>,
}

pub(crate) async fn create_consent_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    axum::Json(body): axum::Json<CreateConsentBody>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    let tenant_id = TenantId(body.tenant_id);
    let permissions = body.permissions.unwrap_or_default();
    match service.create_consent(&tenant_id, &body.requester_id, permissions, body.data_retention)
    {
        Ok(consent) => (StatusCode::CREATED, axum::Json(consent)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestReferenceBody {
    tenant_id: String,
    reference_type: ReferenceType,
    provider: ReferenceProvider,
}

pub(crate) async fn request_reference_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    axum::Json(body): axum::Json<RequestReferenceBody>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    let tenant_id = TenantId(body.tenant_id);
    match service.request_reference(&tenant_id, body.reference_type, body.provider) {
        Ok(record) => {
            (StatusCode::CREATED, axum::Json(record.view(Utc::now()))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resend_reference_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    Path(reference_id): Path<String>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    match service.resend_reference(&ReferenceId(reference_id)) {
        Ok(outcome) => {
            let body = json!({
                "reference": outcome.reference.view(Utc::now()),
                "email_sent": outcome.email_sent,
                "attempt_number": outcome.attempt_number,
                "remaining_attempts": outcome.remaining_attempts,
            });
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RespondBody {
    rating: u8,
    feedback: String,
    details: VerificationDetails,
}

pub(crate) async fn respond_reference_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    Path(token): Path<String>,
    axum::Json(body): axum::Json<RespondBody>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    match service.respond_reference(&token, body.feedback, body.rating, body.details) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view(Utc::now()))).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeclineBody {
    reason: DeclineReason,
    #[serde(default)]
    comment: Option<String>,
}

pub(crate) async fn decline_reference_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    Path(token): Path<String>,
    axum::Json(body): axum::Json<DeclineBody>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    match service.decline_reference(&token, body.reason, body.comment) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view(Utc::now()))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_references_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    match service.list_references(&TenantId(tenant_id)) {
        Ok(records) => {
            let now = Utc::now();
            let views: Vec<_> = records.iter().map(|record| record.view(now)).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn verify_tenant_handler<R, C, T, N>(
    State(service): State<Arc<VerificationService<R, C, T, N>>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    match service.verify_tenant(&TenantId(tenant_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}
