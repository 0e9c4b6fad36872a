// QR Token Service
//
// Self-contained signed tokens for the two-phase service confirmation
// (arrival scan, completion scan). Tokens carry their own signature so a
// scan can be checked without a server-side lookup of pending codes, and
// remain usable offline between issuance and scan. Single-use enforcement
// is the caller's responsibility (see RequestService::consume_qr).

use chrono::Utc;
use hmac::{Hmac, Mac};
use image::{ImageBuffer, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Tokens expire 24 hours after issuance. Physical service windows are
/// same-day, so this bounds replay without getting in the way.
pub const QR_VALIDITY_MS: i64 = 24 * 60 * 60 * 1000;

/// Which half of the two-step confirmation a token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrPhase {
    Start,
    Completion,
}

impl QrPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrPhase::Start => "start",
            QrPhase::Completion => "completion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(QrPhase::Start),
            "completion" => Some(QrPhase::Completion),
            _ => None,
        }
    }
}

/// Wire format of a QR payload, serialized as JSON into the scannable image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrToken {
    pub service_request_id: String,
    pub qr_type: QrPhase,
    /// Issuance time, milliseconds since epoch
    pub timestamp: i64,
    pub uuid: String,
    /// Hex-encoded HMAC-SHA256 over the other four fields
    pub signature: String,
}

/// Result of issuing a token: the serialized payload plus a PNG rendering
#[derive(Debug)]
pub struct IssuedQr {
    pub token: QrToken,
    pub payload: String,
    pub png: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

fn signing_input(service_request_id: &str, phase: QrPhase, timestamp: i64, nonce: &str) -> String {
    format!("{}:{}:{}:{}", service_request_id, phase.as_str(), timestamp, nonce)
}

/// Hex HMAC-SHA256 signature over the token fields
fn sign(secret: &[u8], service_request_id: &str, phase: QrPhase, timestamp: i64, nonce: &str) -> String {
    // HMAC accepts keys of any length, so new_from_slice cannot fail here
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(signing_input(service_request_id, phase, timestamp, nonce).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Issue a signed token for one phase of a service request confirmation
pub fn issue(secret: &[u8], service_request_id: &str, phase: QrPhase) -> Result<IssuedQr, QrError> {
    issue_at(secret, service_request_id, phase, Utc::now().timestamp_millis())
}

fn issue_at(
    secret: &[u8],
    service_request_id: &str,
    phase: QrPhase,
    now_ms: i64,
) -> Result<IssuedQr, QrError> {
    let nonce = Uuid::new_v4().to_string();
    let signature = sign(secret, service_request_id, phase, now_ms, &nonce);

    let token = QrToken {
        service_request_id: service_request_id.to_string(),
        qr_type: phase,
        timestamp: now_ms,
        uuid: nonce,
        signature,
    };

    let payload = serde_json::to_string(&token)?;
    let png = render_png(&payload)?;

    Ok(IssuedQr { token, payload, png })
}

/// Validate a scanned payload string.
///
/// Returns None for anything wrong with it: malformed JSON, a signature
/// that does not match, or a token older than the validity window. The
/// three cases are deliberately not distinguished; the remediation is the
/// same for all of them (re-issue the token).
pub fn validate(secret: &[u8], payload: &str) -> Option<QrToken> {
    validate_at(secret, payload, Utc::now().timestamp_millis())
}

fn validate_at(secret: &[u8], payload: &str, now_ms: i64) -> Option<QrToken> {
    let token: QrToken = serde_json::from_str(payload).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(
        signing_input(&token.service_request_id, token.qr_type, token.timestamp, &token.uuid)
            .as_bytes(),
    );
    let provided = hex::decode(&token.signature).ok()?;
    mac.verify_slice(&provided).ok()?;

    if now_ms - token.timestamp > QR_VALIDITY_MS {
        return None;
    }

    Some(token)
}

/// Render the payload as a scannable PNG image, one 10x10 pixel block per
/// QR module
fn render_png(payload: &str) -> Result<Vec<u8>, QrError> {
    let code = QrCode::new(payload.as_bytes())?;

    let module_size = 10u32;
    let width = code.width() as u32;
    let img_size = width * module_size;

    let mut img = ImageBuffer::<Luma<u8>, Vec<u8>>::new(img_size, img_size);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let module_x = x / module_size;
        let module_y = y / module_size;
        *pixel = match code[(module_x as usize, module_y as usize)] {
            qrcode::types::Color::Dark => Luma([0u8]),
            qrcode::types::Color::Light => Luma([255u8]),
        };
    }

    let mut png_data = Vec::new();
    image::DynamicImage::ImageLuma8(img).write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    )?;

    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-qr-signing-secret";

    #[test]
    fn issue_then_validate_round_trips() {
        let issued = issue(SECRET, "abc123", QrPhase::Start).unwrap();
        let token = validate(SECRET, &issued.payload).expect("freshly issued token validates");

        assert_eq!(token.service_request_id, "abc123");
        assert_eq!(token.qr_type, QrPhase::Start);
        assert_eq!(token.timestamp, issued.token.timestamp);
        assert_eq!(token.uuid, issued.token.uuid);
        assert_eq!(token.signature, issued.token.signature);
    }

    #[test]
    fn payload_uses_the_documented_wire_names() {
        let issued = issue(SECRET, "abc123", QrPhase::Start).unwrap();
        let value: serde_json::Value = serde_json::from_str(&issued.payload).unwrap();

        assert_eq!(value["serviceRequestId"], "abc123");
        assert_eq!(value["qrType"], "start");
        assert!(value["timestamp"].is_i64());
        assert!(value["uuid"].is_string());
        assert!(value["signature"]
            .as_str()
            .unwrap()
            .chars()
            .all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn any_single_character_mutation_invalidates() {
        let issued = issue(SECRET, "abc123", QrPhase::Completion).unwrap();

        for i in 0..issued.payload.len() {
            let mut bytes = issued.payload.clone().into_bytes();
            // Flip to a different same-class character so JSON may still parse
            bytes[i] = if bytes[i] == b'a' { b'b' } else { b'a' };
            let Ok(mutated) = String::from_utf8(bytes) else { continue };
            if mutated == issued.payload {
                continue;
            }
            assert!(
                validate(SECRET, &mutated).is_none(),
                "mutation at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = issue(SECRET, "abc123", QrPhase::Start).unwrap();
        assert!(validate(b"other-secret", &issued.payload).is_none());
    }

    #[test]
    fn expires_after_24_hours_but_not_before() {
        let now = Utc::now().timestamp_millis();
        let issued = issue_at(SECRET, "abc123", QrPhase::Start, now).unwrap();

        // 23h59m later: still valid
        let just_inside = now + QR_VALIDITY_MS - 60 * 1000;
        assert!(validate_at(SECRET, &issued.payload, just_inside).is_some());

        // A minute past the window: rejected
        let just_outside = now + QR_VALIDITY_MS + 60 * 1000;
        assert!(validate_at(SECRET, &issued.payload, just_outside).is_none());
    }

    #[test]
    fn validate_has_no_single_use_memory() {
        // Consuming a token is the caller's job; validate itself is pure
        let issued = issue(SECRET, "abc123", QrPhase::Start).unwrap();
        assert!(validate(SECRET, &issued.payload).is_some());
        assert!(validate(SECRET, &issued.payload).is_some());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(validate(SECRET, "not json").is_none());
        assert!(validate(SECRET, "{}").is_none());
        assert!(validate(SECRET, r#"{"serviceRequestId":"x"}"#).is_none());
    }

    #[test]
    fn renders_a_png() {
        let issued = issue(SECRET, "abc123", QrPhase::Start).unwrap();
        // PNG magic bytes
        assert_eq!(&issued.png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
