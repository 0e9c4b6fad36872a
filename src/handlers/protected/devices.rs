use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::DeviceToken;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RegisterDevice {
    pub fcm_token: String,
    pub platform: Option<String>,
}

/// POST /api/devices - Register a push delivery token for this user
///
/// Re-registering an existing token moves it to the current user, so a
/// shared device follows whoever logged in last.
pub async fn register(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<RegisterDevice>,
) -> ApiResult<DeviceToken> {
    if payload.fcm_token.trim().is_empty() {
        return Err(ApiError::bad_request("fcm_token is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let device = sqlx::query_as::<_, DeviceToken>(
        r#"
        INSERT INTO device_tokens (id, user_id, fcm_token, platform, is_active, created_at, last_used_at)
        VALUES ($1, $2, $3, $4, true, NOW(), NOW())
        ON CONFLICT (fcm_token) DO UPDATE
        SET user_id = EXCLUDED.user_id,
            platform = EXCLUDED.platform,
            is_active = true,
            last_used_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.user_id)
    .bind(payload.fcm_token.trim())
    .bind(&payload.platform)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(device))
}

/// DELETE /api/devices/:token - Deactivate one of this user's delivery tokens
pub async fn unregister(
    Extension(auth_user): Extension<AuthUser>,
    Path(token): Path<String>,
) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query(
        r#"
        UPDATE device_tokens
        SET is_active = false
        WHERE fcm_token = $1 AND user_id = $2
        "#,
    )
    .bind(&token)
    .bind(auth_user.user_id)
    .execute(&pool)
    .await?;

    Ok(ApiResponse::success(json!({
        "removed": result.rows_affected() > 0
    })))
}
