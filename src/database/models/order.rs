use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A kitchen order. Items are stored as submitted by the resident app,
/// one JSON array of {name, quantity, notes} entries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub site_id: Uuid,
    pub resident_id: Uuid,
    pub items: serde_json::Value,
    pub notes: Option<String>,
    pub status: String,
    pub total: Option<Decimal>,
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
