use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Billing invoice. Status track: draft -> accepted -> processing -> paid,
/// with void reachable from draft/accepted. Draft invoices older than 24h
/// are moved to accepted by the externally-triggered sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub site_id: Uuid,
    pub resident_id: Uuid,
    pub service_request_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub stripe_payment_intent: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}
