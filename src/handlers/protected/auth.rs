use axum::Extension;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - Current authenticated user details
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": auth_user.user_id,
        "name": auth_user.name,
        "role": auth_user.role,
        "site_id": auth_user.site_id,
        "department": auth_user.department,
    })))
}

/// PUT /api/auth/refresh - Re-issue a token for the current session
pub async fn refresh(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let claims = Claims::new(
        auth_user.user_id,
        auth_user.site_id,
        auth_user.role,
        auth_user.department.clone(),
        auth_user.name.clone(),
    );

    let token = generate_jwt(claims).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Token refresh failed")
    })?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": config::config().security.jwt_expiry_hours * 3600,
    })))
}
