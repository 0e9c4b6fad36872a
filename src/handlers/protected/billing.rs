use axum::{extract::Path, Extension};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action, ResourceScope};
use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::Invoice;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::payments::StripeClient;

/// GET /api/billing/invoices - List invoices visible to the actor
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Invoice>> {
    let pool = DatabaseManager::pool().await?;

    let invoices = match auth_user.role {
        Role::Resident => {
            sqlx::query_as::<_, Invoice>(
                "SELECT * FROM invoices WHERE resident_id = $1 ORDER BY issued_at DESC",
            )
            .bind(auth_user.user_id)
            .fetch_all(&pool)
            .await?
        }
        Role::Staff | Role::SiteAdmin => {
            sqlx::query_as::<_, Invoice>(
                "SELECT * FROM invoices WHERE site_id = $1 ORDER BY issued_at DESC",
            )
            .bind(auth_user.site_id)
            .fetch_all(&pool)
            .await?
        }
        Role::Superadmin => {
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices ORDER BY issued_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(ApiResponse::success(invoices))
}

/// POST /api/billing/invoices/:id/pay - Start a payment for an invoice
///
/// Creates a PaymentIntent at the payment processor and flags the invoice
/// as processing. The invoice only becomes "paid" when the processor's
/// success callback arrives at /webhooks/stripe.
pub async fn pay(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Invoice {} not found", id)))?;

    let scope = ResourceScope {
        site_id: invoice.site_id,
        owner_id: invoice.resident_id,
    };
    authorize(&auth_user, Some(&scope), Action::PayInvoice)?;

    if invoice.status != "accepted" {
        return Err(ApiError::bad_request(format!(
            "Invoice is {} and cannot be paid",
            invoice.status
        )));
    }

    let amount_cents = (invoice.amount * Decimal::from(100))
        .round()
        .to_i64()
        .filter(|cents| *cents > 0)
        .ok_or_else(|| {
            tracing::error!("Invoice {} has unpayable amount {}", id, invoice.amount);
            ApiError::internal_server_error("Invoice amount is invalid")
        })?;

    let stripe = StripeClient::from_config();
    let intent = stripe
        .create_payment_intent(amount_cents, &invoice.currency, invoice.id)
        .await?;

    sqlx::query(
        r#"
        UPDATE invoices
        SET status = 'processing', stripe_payment_intent = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&intent.id)
    .execute(&pool)
    .await?;

    tracing::info!("Payment intent {} created for invoice {}", intent.id, id);

    Ok(ApiResponse::success(json!({
        "payment_intent_id": intent.id,
        "client_secret": intent.client_secret,
    })))
}
