use axum::Extension;
use serde_json::json;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::push::{self, Dispatch};
use crate::services::video::{self, VideoError};

/// POST /api/sos - Start an emergency video session
///
/// Creates a per-incident room, mints a join token for the caller, and
/// alerts all staff devices at the caller's site. The alert is advisory;
/// the caller gets their room token even if every push fails.
pub async fn create(Extension(auth_user): Extension<AuthUser>) -> ApiResult<serde_json::Value> {
    let site_id = auth_user
        .site_id
        .ok_or_else(|| ApiError::forbidden("Account is not attached to a site"))?;

    let integrations = &config::config().integrations;
    let room = video::sos_room_name();

    let token = video::room_token(
        &integrations.livekit_api_key,
        &integrations.livekit_api_secret,
        &room,
        &auth_user.user_id.to_string(),
        &auth_user.name,
    )
    .map_err(|e| match e {
        VideoError::NotConfigured => {
            ApiError::service_unavailable("Video gateway is not configured")
        }
        VideoError::Token(err) => {
            tracing::error!("LiveKit token generation failed: {}", err);
            ApiError::internal_server_error("Failed to start video session")
        }
    })?;

    tracing::warn!("SOS session {} started by {} at site {}", room, auth_user.user_id, site_id);

    let pool = DatabaseManager::pool().await?;
    push::notify_department(
        &pool,
        site_id,
        None, // all staff at the site
        Dispatch::new(
            "Emergency SOS",
            format!("{} needs assistance", auth_user.name),
            json!({ "type": "sos", "room": room, "from": auth_user.user_id }),
        ),
    )
    .await;

    Ok(ApiResponse::created(json!({
        "room": room,
        "token": token,
        "url": integrations.livekit_url,
    })))
}
