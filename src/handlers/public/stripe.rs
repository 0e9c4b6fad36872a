use axum::http::HeaderMap;
use serde_json::json;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::payments::{self, StripeEvent};

/// POST /webhooks/stripe - Payment success callback
///
/// The signature header is verified against the webhook secret before any
/// state change. A succeeded payment intent flips the matching invoice to
/// "paid"; every other event type is acknowledged and ignored.
pub async fn stripe_webhook(headers: HeaderMap, body: String) -> ApiResult<serde_json::Value> {
    let secret = &config::config().integrations.stripe_webhook_secret;
    if secret.is_empty() {
        return Err(ApiError::service_unavailable("Payment gateway is not configured"));
    }

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing Stripe-Signature header"))?;

    if !payments::verify_webhook_signature(secret, signature, &body) {
        tracing::warn!("Rejected Stripe webhook with invalid signature");
        return Err(ApiError::bad_request("Invalid webhook signature"));
    }

    let event: StripeEvent = serde_json::from_str(&body)
        .map_err(|_| ApiError::bad_request("Malformed webhook payload"))?;

    if event.event_type == "payment_intent.succeeded" {
        let intent_id = event.data.object["id"]
            .as_str()
            .ok_or_else(|| ApiError::bad_request("Webhook event has no payment intent id"))?;

        let pool = DatabaseManager::pool().await?;

        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'paid', paid_at = NOW()
            WHERE stripe_payment_intent = $1
              AND status <> 'paid'
            "#,
        )
        .bind(intent_id)
        .execute(&pool)
        .await?;

        if updated.rows_affected() > 0 {
            tracing::info!("Invoice paid via payment intent {}", intent_id);
        } else {
            tracing::warn!("No invoice matched payment intent {}", intent_id);
        }
    }

    Ok(ApiResponse::success(json!({ "received": true })))
}
