use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A resident-initiated request for a facility service (meal, laundry,
/// housekeeping, transportation, maintenance, home_care, medical).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub site_id: Uuid,
    pub resident_id: Uuid,
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub assigned_department: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Set exactly while status is "completed", cleared otherwise
    pub completed_date: Option<DateTime<Utc>>,
    /// Per-phase single-use flags for the two-step QR confirmation
    pub qr_start_used: bool,
    pub qr_completion_used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
