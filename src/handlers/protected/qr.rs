use axum::{extract::Path, Extension, Json};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action, ResourceScope};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::push::{self, Dispatch};
use crate::services::qr_token::{self, QrPhase, QR_VALIDITY_MS};
use crate::services::request_service::{self, StatusUpdate};
use crate::workflow::{ResourceKind, ResourceStatus, ServiceRequestStatus};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub payload: String,
}

/// Statuses from which each phase may be issued
fn phase_is_issuable(phase: QrPhase, status: ServiceRequestStatus) -> bool {
    match phase {
        QrPhase::Start => matches!(
            status,
            ServiceRequestStatus::Assigned | ServiceRequestStatus::Processing
        ),
        QrPhase::Completion => matches!(
            status,
            ServiceRequestStatus::InProgress | ServiceRequestStatus::AwaitingCompletion
        ),
    }
}

/// The status a successful scan moves the request to
fn phase_target(phase: QrPhase) -> ServiceRequestStatus {
    match phase {
        QrPhase::Start => ServiceRequestStatus::InProgress,
        QrPhase::Completion => ServiceRequestStatus::Completed,
    }
}

/// POST /api/qr/requests/:id/:phase - Issue a signed QR token
///
/// Returns the serialized payload together with a base64 PNG rendering of
/// it. Nothing is persisted; the per-phase used flag is only consumed at
/// scan time.
pub async fn issue(
    Extension(auth_user): Extension<AuthUser>,
    Path((id, phase)): Path<(Uuid, String)>,
) -> ApiResult<serde_json::Value> {
    let phase = QrPhase::parse(&phase)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown QR phase '{}'", phase)))?;

    let secret = &config::config().security.qr_secret;
    if secret.is_empty() {
        return Err(ApiError::service_unavailable("QR signing secret is not configured"));
    }

    let pool = DatabaseManager::pool().await?;
    let request = request_service::get_request(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Service request {} not found", id)))?;

    let scope = ResourceScope {
        site_id: request.site_id,
        owner_id: request.resident_id,
    };
    authorize(&auth_user, Some(&scope), Action::IssueQr)?;

    let status = ServiceRequestStatus::parse(&request.status).ok_or_else(|| {
        tracing::error!("Request {} has unrecognized status '{}'", id, request.status);
        ApiError::internal_server_error("Request is in an unknown status")
    })?;

    if !phase_is_issuable(phase, status) {
        return Err(ApiError::bad_request(format!(
            "A {} QR cannot be issued while the request is {}",
            phase.as_str(),
            status.as_str()
        )));
    }

    let issued = qr_token::issue(secret.as_bytes(), &id.to_string(), phase)?;

    Ok(ApiResponse::success(json!({
        "payload": issued.payload,
        "image_base64": BASE64.encode(&issued.png),
        "expires_at": issued.token.timestamp + QR_VALIDITY_MS,
    })))
}

/// POST /api/qr/scan - Validate a scanned payload and apply its transition
///
/// Malformed, tampered, and expired payloads are all reported as one
/// generic invalid outcome. A valid token is consumed once per phase: the
/// second scan gets a 409.
pub async fn scan(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ScanRequest>,
) -> ApiResult<serde_json::Value> {
    let secret = &config::config().security.qr_secret;
    if secret.is_empty() {
        return Err(ApiError::service_unavailable("QR signing secret is not configured"));
    }

    let token = qr_token::validate(secret.as_bytes(), &payload.payload)
        .ok_or_else(|| ApiError::bad_request("Invalid or expired QR code"))?;

    let request_id: Uuid = token
        .service_request_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid or expired QR code"))?;

    let pool = DatabaseManager::pool().await?;
    let request = request_service::get_request(&pool, request_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Service request {} not found", request_id)))?;

    let scope = ResourceScope {
        site_id: request.site_id,
        owner_id: request.resident_id,
    };
    authorize(&auth_user, Some(&scope), Action::ScanQr)?;

    let current = ResourceStatus::parse(ResourceKind::ServiceRequest, &request.status)?;
    let next = ResourceStatus::ServiceRequest(phase_target(token.qr_type));
    ResourceStatus::check_transition(current, next)?;

    // Atomic consume: the losing side of a double scan sees false here
    let consumed = request_service::consume_qr(&pool, request_id, token.qr_type).await?;
    if !consumed {
        return Err(ApiError::conflict(format!(
            "The {} QR for this request was already used",
            token.qr_type.as_str()
        )));
    }

    let updated = request_service::apply_status(&pool, request_id, next, StatusUpdate::default()).await?;

    tracing::info!(
        "QR {} scan moved request {} to {}",
        token.qr_type.as_str(),
        request_id,
        next.as_str()
    );

    push::notify_user(
        &pool,
        updated.resident_id,
        Dispatch::new(
            "Service update",
            match token.qr_type {
                QrPhase::Start => "Your service provider has arrived".to_string(),
                QrPhase::Completion => "Your service has been completed".to_string(),
            },
            json!({ "type": "qr_scan", "request_id": updated.id, "status": next.as_str() }),
        ),
    )
    .await;

    Ok(ApiResponse::success(json!({
        "request": updated,
        "phase": token.qr_type,
    })))
}
