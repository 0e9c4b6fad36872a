use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use sqlx::Row;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// Validated site information for the authenticated actor
#[derive(Clone, Debug)]
pub struct ValidatedSite {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
}

/// Middleware that validates the actor's site from JWT claims against the
/// sites table. Ensures the site exists and is active. Superadmins have no
/// site binding and pass through without a ValidatedSite extension.
pub async fn validate_site_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    // Get AuthUser from previous JWT middleware
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| {
            let api_error = ApiError::unauthorized("JWT authentication required before site validation");
            error_response(api_error)
        })?
        .clone();

    if auth_user.role == Role::Superadmin {
        return Ok::<_, (StatusCode, Json<serde_json::Value>)>(next.run(request).await);
    }

    let site_id = auth_user.site_id.ok_or_else(|| {
        let api_error = ApiError::forbidden("Account is not attached to a site");
        error_response(api_error)
    })?;

    let pool = DatabaseManager::pool().await.map_err(|e| {
        let api_error: ApiError = e.into();
        error_response(api_error)
    })?;

    let query = r#"
        SELECT id, name, timezone
        FROM sites
        WHERE id = $1
        AND is_active = true
        AND deleted_at IS NULL
    "#;

    let row = sqlx::query(query)
        .bind(site_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error validating site: {}", e);
            let api_error = ApiError::internal_server_error("Failed to validate site");
            error_response(api_error)
        })?;

    let site_row = row.ok_or_else(|| {
        tracing::warn!("Site validation failed: site '{}' not found or inactive", site_id);
        let api_error = ApiError::forbidden("Site is not active or does not exist");
        error_response(api_error)
    })?;

    let validated_site = ValidatedSite {
        id: site_row.get("id"),
        name: site_row.get("name"),
        timezone: site_row.get("timezone"),
    };

    tracing::debug!("Site validation successful: {} ({})", validated_site.name, validated_site.id);

    request.extensions_mut().insert(validated_site);

    Ok(next.run(request).await)
}

fn error_response(api_error: ApiError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::from_u16(api_error.status_code()).unwrap(),
        Json(api_error.to_json()),
    )
}
