// Emergency SOS video sessions
//
// The server only mints LiveKit access tokens (HS256 JWTs with a video
// grant); media transport is entirely LiveKit's concern.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room join tokens are short-lived; an SOS call starts immediately
const TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoGrant {
    pub room: String,
    #[serde(rename = "roomJoin")]
    pub room_join: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomClaims {
    /// LiveKit API key
    pub iss: String,
    /// Participant identity
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("video gateway is not configured")]
    NotConfigured,

    #[error("token generation failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Per-incident room name
pub fn sos_room_name() -> String {
    format!("sos-{}", Uuid::new_v4())
}

/// Mint a LiveKit room access token for one participant
pub fn room_token(
    api_key: &str,
    api_secret: &str,
    room: &str,
    identity: &str,
    display_name: &str,
) -> Result<String, VideoError> {
    if api_key.is_empty() || api_secret.is_empty() {
        return Err(VideoError::NotConfigured);
    }

    let now = Utc::now();
    let claims = RoomClaims {
        iss: api_key.to_string(),
        sub: identity.to_string(),
        name: display_name.to_string(),
        nbf: now.timestamp(),
        exp: (now + Duration::minutes(TOKEN_TTL_MINUTES)).timestamp(),
        video: VideoGrant {
            room: room.to_string(),
            room_join: true,
        },
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn room_names_are_unique() {
        assert_ne!(sos_room_name(), sos_room_name());
        assert!(sos_room_name().starts_with("sos-"));
    }

    #[test]
    fn token_carries_the_video_grant() {
        let token = room_token("api-key", "api-secret", "sos-room-1", "user-1", "Ada").unwrap();

        let decoded = decode::<RoomClaims>(
            &token,
            &DecodingKey::from_secret(b"api-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "api-key");
        assert_eq!(decoded.claims.sub, "user-1");
        assert_eq!(decoded.claims.video.room, "sos-room-1");
        assert!(decoded.claims.video.room_join);
        assert!(decoded.claims.exp > decoded.claims.nbf);
    }

    #[test]
    fn missing_credentials_are_reported() {
        assert!(matches!(
            room_token("", "", "room", "id", "name"),
            Err(VideoError::NotConfigured)
        ));
    }
}
