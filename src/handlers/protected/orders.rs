use axum::{extract::Path, Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action, ResourceScope};
use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::Order;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::push::{self, Dispatch};
use crate::workflow::{ResourceKind, ResourceStatus};

/// Kitchen staff department, used for new-order notifications
const KITCHEN_DEPARTMENT: &str = "kitchen";

#[derive(Debug, Deserialize)]
pub struct CreateOrder {
    pub items: serde_json::Value,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrder {
    pub items: Option<serde_json::Value>,
    pub notes: Option<String>,
    // Staff-only fields
    pub status: Option<String>,
    pub total: Option<Decimal>,
}

fn scope_of(order: &Order) -> ResourceScope {
    ResourceScope {
        site_id: order.site_id,
        owner_id: order.resident_id,
    }
}

async fn get_order(pool: &sqlx::PgPool, id: Uuid) -> Result<Order, ApiError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Order {} not found", id)))
}

/// GET /api/orders - List orders visible to the actor
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Order>> {
    let pool = DatabaseManager::pool().await?;

    let orders = match auth_user.role {
        Role::Resident => {
            sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE resident_id = $1 ORDER BY created_at DESC",
            )
            .bind(auth_user.user_id)
            .fetch_all(&pool)
            .await?
        }
        Role::Staff | Role::SiteAdmin => {
            sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE site_id = $1 ORDER BY created_at DESC",
            )
            .bind(auth_user.site_id)
            .fetch_all(&pool)
            .await?
        }
        Role::Superadmin => {
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(ApiResponse::success(orders))
}

/// POST /api/orders - Resident submits a kitchen order
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateOrder>,
) -> ApiResult<Order> {
    if auth_user.role != Role::Resident {
        return Err(ApiError::forbidden("Only residents submit orders"));
    }
    let site_id = auth_user
        .site_id
        .ok_or_else(|| ApiError::forbidden("Account is not attached to a site"))?;

    let items_ok = payload
        .items
        .as_array()
        .map(|items| !items.is_empty())
        .unwrap_or(false);
    if !items_ok {
        return Err(ApiError::bad_request("items must be a non-empty array"));
    }

    let pool = DatabaseManager::pool().await?;

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders
            (id, site_id, resident_id, items, notes, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'submitted', NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(site_id)
    .bind(auth_user.user_id)
    .bind(&payload.items)
    .bind(&payload.notes)
    .fetch_one(&pool)
    .await?;

    push::notify_department(
        &pool,
        site_id,
        Some(KITCHEN_DEPARTMENT),
        Dispatch::new(
            "New kitchen order",
            format!("Order from {}", auth_user.name),
            json!({ "type": "order_created", "order_id": order.id }),
        ),
    )
    .await;

    Ok(ApiResponse::created(order))
}

/// GET /api/orders/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    let pool = DatabaseManager::pool().await?;
    let order = get_order(&pool, id).await?;

    authorize(&auth_user, Some(&scope_of(&order)), Action::ViewResource)?;

    Ok(ApiResponse::success(order))
}

/// PATCH /api/orders/:id - Update an order
///
/// Residents may change items/notes only while the order is still
/// submitted (silently ignored afterwards); kitchen staff move the order
/// through its track and set the total.
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrder>,
) -> ApiResult<Order> {
    let pool = DatabaseManager::pool().await?;
    let order = get_order(&pool, id).await?;

    let scope = scope_of(&order);
    let current = ResourceStatus::parse(ResourceKind::Order, &order.status)?;

    if auth_user.role == Role::Resident {
        authorize(&auth_user, Some(&scope), Action::EditDetails)?;

        if payload.status.is_some() || payload.total.is_some() {
            return Err(ApiError::forbidden("Residents cannot change status or totals"));
        }

        if !current.is_initial() {
            return Ok(ApiResponse::success(order));
        }

        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET items = COALESCE($2, items),
                notes = COALESCE($3, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.items)
        .bind(payload.notes)
        .fetch_one(&pool)
        .await?;

        return Ok(ApiResponse::success(updated));
    }

    match payload.status.as_deref() {
        Some(raw_status) => {
            let next = ResourceStatus::parse(ResourceKind::Order, raw_status)?;
            authorize(&auth_user, Some(&scope), Action::SetStatus)?;
            ResourceStatus::check_transition(current, next)?;

            let completed_date: Option<DateTime<Utc>> = if next.marks_completion() {
                Some(Utc::now())
            } else {
                None
            };

            let updated = sqlx::query_as::<_, Order>(
                r#"
                UPDATE orders
                SET status = $2,
                    completed_date = $3,
                    total = COALESCE($4, total),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(next.as_str())
            .bind(completed_date)
            .bind(payload.total)
            .fetch_one(&pool)
            .await?;

            push::notify_user(
                &pool,
                updated.resident_id,
                Dispatch::new(
                    "Order update",
                    format!("Your order is now {}", next.as_str()),
                    json!({ "type": "order_status", "order_id": updated.id, "status": next.as_str() }),
                ),
            )
            .await;

            Ok(ApiResponse::success(updated))
        }
        None => {
            authorize(&auth_user, Some(&scope), Action::EditDetails)?;

            let updated = sqlx::query_as::<_, Order>(
                r#"
                UPDATE orders
                SET items = COALESCE($2, items),
                    notes = COALESCE($3, notes),
                    total = COALESCE($4, total),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(payload.items)
            .bind(payload.notes)
            .bind(payload.total)
            .fetch_one(&pool)
            .await?;

            Ok(ApiResponse::success(updated))
        }
    }
}
