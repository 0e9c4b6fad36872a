// Push Notification Service - Firebase Cloud Messaging (FCM) HTTP v1 API
//
// Uses OAuth 2.0 service account authentication (gcp_auth) against the
// FCM HTTP v1 endpoint. Notifications are advisory: every failure in this
// module is logged and swallowed so a push problem never blocks the
// business action that triggered it.
//
// Configuration:
// - GOOGLE_APPLICATION_CREDENTIALS: path to the service account JSON file
// - FIREBASE_PROJECT_ID: Firebase project ID

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config;

/// FCM HTTP v1 API message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmMessage {
    pub message: FcmMessageBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmMessageBody {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<FcmNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

/// A notification to fan out to a set of devices
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl Dispatch {
    pub fn new(title: impl Into<String>, body: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data,
        }
    }

    /// FCM v1 requires string values in the data map
    fn data_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(obj) = self.data.as_object() {
            for (key, value) in obj {
                map.insert(
                    key.clone(),
                    match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                );
            }
        }
        map
    }

    fn to_message(&self, token: &str) -> FcmMessage {
        let data = self.data_map();
        FcmMessage {
            message: FcmMessageBody {
                token: token.to_string(),
                notification: Some(FcmNotification {
                    title: self.title.clone(),
                    body: self.body.clone(),
                }),
                data: if data.is_empty() { None } else { Some(data) },
            },
        }
    }
}

/// Seam for the external push gateway, so dispatch logic is testable
/// without network access
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &FcmMessage) -> Result<()>;
    fn is_configured(&self) -> bool;
}

/// Cached OAuth token with expiration
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct FcmClient {
    http_client: Client,
    firebase_project_id: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl FcmClient {
    pub fn new(firebase_project_id: String) -> Self {
        if firebase_project_id.is_empty() {
            warn!("FCM not configured: FIREBASE_PROJECT_ID is unset, notifications will be skipped");
        } else {
            info!("FCM HTTP v1 configured for project: {}", firebase_project_id);
        }

        Self {
            http_client: Client::new(),
            firebase_project_id,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    fn fcm_endpoint(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.firebase_project_id
        )
    }

    /// Get a valid OAuth token for FCM, refreshing the cache when needed
    async fn get_oauth_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(ref cached) = *cache {
                // Use token if it has at least 5 minutes of validity left
                if cached.expires_at > Utc::now() + Duration::minutes(5) {
                    return Ok(cached.token.clone());
                }
            }
        }

        let provider = gcp_auth::provider()
            .await
            .context("Failed to create GCP auth provider")?;

        let scopes = &["https://www.googleapis.com/auth/firebase.messaging"];
        let token = provider
            .token(scopes)
            .await
            .context("Failed to get OAuth token for FCM")?;

        let token_string = token.as_str().to_string();

        // Tokens typically last an hour; cache for 50 minutes
        let expires_at = Utc::now() + Duration::minutes(50);
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_string.clone(),
                expires_at,
            });
        }

        debug!("Obtained new FCM OAuth token, valid until {}", expires_at);
        Ok(token_string)
    }
}

#[async_trait]
impl PushGateway for FcmClient {
    async fn send(&self, message: &FcmMessage) -> Result<()> {
        let oauth_token = self.get_oauth_token().await?;

        let response = self
            .http_client
            .post(self.fcm_endpoint())
            .header("Authorization", format!("Bearer {}", oauth_token))
            .header("Content-Type", "application/json")
            .json(message)
            .send()
            .await
            .context("Failed to send FCM request")?;

        let status = response.status();
        if status.is_success() {
            debug!("FCM message sent");
            Ok(())
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(anyhow::anyhow!("FCM request failed ({}): {}", status, error_body))
        }
    }

    fn is_configured(&self) -> bool {
        !self.firebase_project_id.is_empty()
            && std::env::var("GOOGLE_APPLICATION_CREDENTIALS").is_ok()
    }
}

/// Shared gateway instance. The reqwest client keeps its connection pool
/// and the OAuth token cache survives across dispatches.
pub fn gateway() -> Arc<dyn PushGateway> {
    use std::sync::OnceLock;
    static GATEWAY: OnceLock<Arc<FcmClient>> = OnceLock::new();
    GATEWAY
        .get_or_init(|| {
            Arc::new(FcmClient::new(
                config::config().integrations.firebase_project_id.clone(),
            ))
        })
        .clone()
}

/// Fan a notification out to a list of delivery tokens. Best effort: the
/// per-token outcome is not verified beyond logging, and this function
/// never returns an error.
pub async fn dispatch(gateway: &dyn PushGateway, tokens: &[String], note: &Dispatch) {
    if tokens.is_empty() {
        return;
    }
    if !gateway.is_configured() {
        warn!("FCM not configured, skipping notification '{}'", note.title);
        return;
    }

    let sends = tokens.iter().map(|token| {
        let message = note.to_message(token);
        async move { gateway.send(&message).await }
    });

    let results = join_all(sends).await;
    let failed = results.iter().filter(|r| r.is_err()).count();
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        warn!("Failed to send push notification: {}", err);
    }

    info!(
        "Dispatched '{}' to {} devices ({} failed)",
        note.title,
        tokens.len(),
        failed
    );
}

/// Active delivery tokens for a single user
pub async fn user_tokens(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT fcm_token
        FROM device_tokens
        WHERE user_id = $1
          AND is_active = true
        ORDER BY last_used_at DESC NULLS LAST
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Active delivery tokens for every staff member of a department at a site.
/// A NULL department selects all staff at the site.
pub async fn department_tokens(
    pool: &PgPool,
    site_id: Uuid,
    department: Option<&str>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT d.fcm_token
        FROM device_tokens d
        JOIN users u ON u.id = d.user_id
        WHERE d.is_active = true
          AND u.is_active = true
          AND u.site_id = $1
          AND u.role IN ('staff', 'site_admin')
          AND ($2::text IS NULL OR u.department = $2)
        "#,
    )
    .bind(site_id)
    .bind(department)
    .fetch_all(pool)
    .await
}

/// Notify one user's devices, swallowing every failure
pub async fn notify_user(pool: &PgPool, user_id: Uuid, note: Dispatch) {
    match user_tokens(pool, user_id).await {
        Ok(tokens) => dispatch(gateway().as_ref(), &tokens, &note).await,
        Err(e) => warn!("Failed to load device tokens for user {}: {}", user_id, e),
    }
}

/// Notify a department's staff devices at a site, swallowing every failure
pub async fn notify_department(pool: &PgPool, site_id: Uuid, department: Option<&str>, note: Dispatch) {
    match department_tokens(pool, site_id, department).await {
        Ok(tokens) => dispatch(gateway().as_ref(), &tokens, &note).await,
        Err(e) => warn!("Failed to load department tokens for site {}: {}", site_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeGateway {
        sent: Mutex<Vec<FcmMessage>>,
        fail: bool,
    }

    impl FakeGateway {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl PushGateway for FakeGateway {
        async fn send(&self, message: &FcmMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                anyhow::bail!("simulated gateway failure");
            }
            Ok(())
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    #[test]
    fn data_values_are_stringified() {
        let note = Dispatch::new(
            "Status update",
            "Your request moved to in_progress",
            json!({"requestId": "abc123", "attempt": 2, "urgent": true}),
        );
        let map = note.data_map();
        assert_eq!(map["requestId"], "abc123");
        assert_eq!(map["attempt"], "2");
        assert_eq!(map["urgent"], "true");
    }

    #[test]
    fn message_shape_matches_fcm_v1() {
        let note = Dispatch::new("Title", "Body", json!({"k": "v"}));
        let message = note.to_message("device-token-1");
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["message"]["token"], "device-token-1");
        assert_eq!(value["message"]["notification"]["title"], "Title");
        assert_eq!(value["message"]["data"]["k"], "v");
    }

    #[test]
    fn empty_data_is_omitted() {
        let note = Dispatch::new("Title", "Body", json!({}));
        let value = serde_json::to_value(note.to_message("t")).unwrap();
        assert!(value["message"].get("data").is_none());
    }

    #[tokio::test]
    async fn dispatch_sends_one_message_per_token() {
        let gateway = FakeGateway::new(false);
        let note = Dispatch::new("Title", "Body", json!({}));
        let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        dispatch(&gateway, &tokens, &note).await;
        assert_eq!(gateway.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dispatch_swallows_gateway_failures() {
        let gateway = FakeGateway::new(true);
        let note = Dispatch::new("Title", "Body", json!({}));
        let tokens = vec!["a".to_string()];

        // Must not panic or propagate; failures are advisory
        dispatch(&gateway, &tokens, &note).await;
        assert_eq!(gateway.sent.lock().unwrap().len(), 1);
    }
}
