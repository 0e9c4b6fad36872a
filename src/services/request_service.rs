// Service-request lifecycle persistence
//
// Each transition is a single row update; the completion timestamp is
// written in the same statement as the status so the two can never drift.
// Concurrent staff updates resolve last-writer-wins.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::ServiceRequest;
use crate::services::qr_token::QrPhase;
use crate::workflow::ResourceStatus;

/// Staff-supplied fields accompanying a status overwrite. Absent fields
/// keep their current value.
#[derive(Debug, Default)]
pub struct StatusUpdate {
    pub assigned_to: Option<Uuid>,
    pub assigned_department: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Apply a status transition to a service request. Entering "completed"
/// stamps completed_date; entering anything else clears it.
pub async fn apply_status(
    pool: &PgPool,
    request_id: Uuid,
    status: ResourceStatus,
    update: StatusUpdate,
) -> Result<ServiceRequest, sqlx::Error> {
    let completed_date: Option<DateTime<Utc>> = if status.marks_completion() {
        Some(Utc::now())
    } else {
        None
    };

    sqlx::query_as::<_, ServiceRequest>(
        r#"
        UPDATE service_requests
        SET status = $2,
            completed_date = $3,
            assigned_to = COALESCE($4, assigned_to),
            assigned_department = COALESCE($5, assigned_department),
            estimated_cost = COALESCE($6, estimated_cost),
            actual_cost = COALESCE($7, actual_cost),
            scheduled_date = COALESCE($8, scheduled_date),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(request_id)
    .bind(status.as_str())
    .bind(completed_date)
    .bind(update.assigned_to)
    .bind(update.assigned_department)
    .bind(update.estimated_cost)
    .bind(update.actual_cost)
    .bind(update.scheduled_date)
    .fetch_one(pool)
    .await
}

/// Consume the per-phase QR used flag. The conditional WHERE makes this
/// atomic: of two concurrent scans of the same phase, exactly one sees the
/// flag unset and wins. Returns false when the flag was already consumed.
pub async fn consume_qr(
    pool: &PgPool,
    request_id: Uuid,
    phase: QrPhase,
) -> Result<bool, sqlx::Error> {
    let sql = match phase {
        QrPhase::Start => {
            r#"
            UPDATE service_requests
            SET qr_start_used = true, updated_at = NOW()
            WHERE id = $1 AND qr_start_used = false
            RETURNING id
            "#
        }
        QrPhase::Completion => {
            r#"
            UPDATE service_requests
            SET qr_completion_used = true, updated_at = NOW()
            WHERE id = $1 AND qr_completion_used = false
            RETURNING id
            "#
        }
    };

    let row: Option<(Uuid,)> = sqlx::query_as(sql).bind(request_id).fetch_optional(pool).await?;
    Ok(row.is_some())
}

/// Fetch a request by id
pub async fn get_request(
    pool: &PgPool,
    request_id: Uuid,
) -> Result<Option<ServiceRequest>, sqlx::Error> {
    sqlx::query_as::<_, ServiceRequest>("SELECT * FROM service_requests WHERE id = $1")
        .bind(request_id)
        .fetch_optional(pool)
        .await
}
