// Invoice auto-accept sweep
//
// Draft invoices older than 24 hours move to accepted. There is no
// in-process timer; an external cron trigger hits this endpoint.

use serde_json::json;
use sqlx::Row;

use crate::database::manager::DatabaseManager;
use crate::middleware::response::{ApiResponse, ApiResult};

/// POST /api/root/invoices/sweep - Accept all draft invoices older than 24h
///
/// Idempotent: a second run right after the first finds nothing to do.
pub async fn invoice_sweep() -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;

    let rows = sqlx::query(
        r#"
        UPDATE invoices
        SET status = 'accepted', accepted_at = NOW()
        WHERE status = 'draft'
          AND issued_at < NOW() - INTERVAL '24 hours'
        RETURNING id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let accepted: Vec<uuid::Uuid> = rows.iter().map(|row| row.get("id")).collect();

    tracing::info!("Invoice sweep accepted {} draft invoices", accepted.len());

    Ok(ApiResponse::success(json!({
        "accepted": accepted.len(),
        "invoice_ids": accepted,
    })))
}
