use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{generate_jwt, Claims, Role};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: serde_json::Value,
    pub expires_in: u64,
}

/// POST /auth/login - Authenticate a user and receive a JWT token
pub async fn login(Json(payload): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE email = $1
          AND is_active = true
          AND deleted_at IS NULL
        "#,
    )
    .bind(payload.email.trim())
    .fetch_optional(&pool)
    .await?;

    // Same error for unknown email and wrong password
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let password_ok = bcrypt::verify(&payload.password, &user.password_hash).map_err(|e| {
        tracing::error!("Password verification error: {}", e);
        ApiError::internal_server_error("Authentication failed")
    })?;

    if !password_ok {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        tracing::error!("User {} has unrecognized role '{}'", user.id, user.role);
        ApiError::internal_server_error("Account is misconfigured")
    })?;

    let claims = Claims::new(
        user.id,
        user.site_id,
        role,
        user.department.clone(),
        user.name.clone(),
    );

    let token = generate_jwt(claims).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Authentication failed")
    })?;

    tracing::info!("User {} ({}) logged in", user.email, role);

    Ok(ApiResponse::success(LoginResponse {
        token,
        user: json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "site_id": user.site_id,
            "department": user.department,
        }),
        expires_in: config::config().security.jwt_expiry_hours * 3600,
    }))
}
