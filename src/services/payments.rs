// Payment capture via Stripe
//
// All money movement is delegated to Stripe. Locally an invoice only
// carries a status flag that flips when the success callback arrives.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },
}

/// The subset of Stripe's PaymentIntent the API surfaces to clients
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

pub struct StripeClient {
    http_client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http_client: Client::new(),
            secret_key,
        }
    }

    pub fn from_config() -> Self {
        Self::new(crate::config::config().integrations.stripe_secret_key.clone())
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }

    /// Create a PaymentIntent for an invoice. Amount is in the currency's
    /// smallest unit (cents).
    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        invoice_id: Uuid,
    ) -> Result<PaymentIntent, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }

        let params = [
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_string()),
            ("metadata[invoice_id]", invoice_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .http_client
            .post(format!("{}/payment_intents", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Stripe request failed ({}): {}", status, message);
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<PaymentIntent>().await?)
    }
}

/// A Stripe webhook event, reduced to the fields the callback handler reads
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Verify a `Stripe-Signature` header (`t=<ts>,v1=<hex>,...`) against the
/// webhook secret: the v1 signature is HMAC-SHA256 over `"{t}.{body}"`.
pub fn verify_webhook_signature(secret: &str, signature_header: &str, body: &str) -> bool {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if signatures.is_empty() {
        return false;
    }

    let signed_payload = format!("{}.{}", timestamp, body);

    signatures.iter().any(|candidate| {
        let Ok(provided) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());
        mac.verify_slice(&provided).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature_header() {
        let secret = "whsec_test";
        let body = r#"{"type":"payment_intent.succeeded"}"#;
        let header = format!("t=1712000000,v1={}", sign(secret, "1712000000", body));

        assert!(verify_webhook_signature(secret, &header, body));
    }

    #[test]
    fn rejects_tampered_bodies_and_wrong_secrets() {
        let secret = "whsec_test";
        let body = r#"{"type":"payment_intent.succeeded"}"#;
        let header = format!("t=1712000000,v1={}", sign(secret, "1712000000", body));

        assert!(!verify_webhook_signature(secret, &header, r#"{"type":"other"}"#));
        assert!(!verify_webhook_signature("whsec_other", &header, body));
    }

    #[test]
    fn rejects_malformed_headers() {
        let secret = "whsec_test";
        assert!(!verify_webhook_signature(secret, "", "{}"));
        assert!(!verify_webhook_signature(secret, "t=123", "{}"));
        assert!(!verify_webhook_signature(secret, "v1=deadbeef", "{}"));
        assert!(!verify_webhook_signature(secret, "t=123,v1=nothex", "{}"));
    }

    #[test]
    fn accepts_any_of_multiple_v1_signatures() {
        let secret = "whsec_test";
        let body = "{}";
        let good = sign(secret, "42", body);
        let header = format!("t=42,v1=0000,v1={}", good);

        assert!(verify_webhook_signature(secret, &header, body));
    }

    #[test]
    fn parses_event_envelope() {
        let raw = r#"{
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123", "status": "succeeded" } }
        }"#;
        let event: StripeEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object["id"], "pi_123");
    }
}
