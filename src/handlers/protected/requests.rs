use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action, ResourceScope};
use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::ServiceRequest;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::push::{self, Dispatch};
use crate::services::request_service::{self, StatusUpdate};
use crate::workflow::{ResourceKind, ResourceStatus};

/// Accepted service categories. The category doubles as the department
/// whose staff get notified about the request.
const CATEGORIES: &[&str] = &[
    "meal",
    "laundry",
    "housekeeping",
    "transportation",
    "maintenance",
    "home_care",
    "medical",
];

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    // Descriptive fields, resident-editable while pending
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    // Staff-only fields
    pub status: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub assigned_department: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

fn scope_of(request: &ServiceRequest) -> ResourceScope {
    ResourceScope {
        site_id: request.site_id,
        owner_id: request.resident_id,
    }
}

/// GET /api/requests - List service requests visible to the actor
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ServiceRequest>> {
    // Reject unknown status filters before querying
    if let Some(status) = query.status.as_deref() {
        ResourceStatus::parse(ResourceKind::ServiceRequest, status)?;
    }

    let pool = DatabaseManager::pool().await?;

    let requests = match auth_user.role {
        Role::Resident => {
            sqlx::query_as::<_, ServiceRequest>(
                r#"
                SELECT * FROM service_requests
                WHERE resident_id = $1
                  AND ($2::text IS NULL OR status = $2)
                ORDER BY created_at DESC
                "#,
            )
            .bind(auth_user.user_id)
            .bind(query.status)
            .fetch_all(&pool)
            .await?
        }
        Role::Staff | Role::SiteAdmin => {
            sqlx::query_as::<_, ServiceRequest>(
                r#"
                SELECT * FROM service_requests
                WHERE site_id = $1
                  AND ($2::text IS NULL OR status = $2)
                ORDER BY created_at DESC
                "#,
            )
            .bind(auth_user.site_id)
            .bind(query.status)
            .fetch_all(&pool)
            .await?
        }
        Role::Superadmin => {
            sqlx::query_as::<_, ServiceRequest>(
                r#"
                SELECT * FROM service_requests
                WHERE ($1::text IS NULL OR status = $1)
                ORDER BY created_at DESC
                "#,
            )
            .bind(query.status)
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(ApiResponse::success(requests))
}

/// POST /api/requests - Resident opens a new service request
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateRequest>,
) -> ApiResult<ServiceRequest> {
    if auth_user.role != Role::Resident {
        return Err(ApiError::forbidden("Only residents open service requests"));
    }
    let site_id = auth_user
        .site_id
        .ok_or_else(|| ApiError::forbidden("Account is not attached to a site"))?;

    if !CATEGORIES.contains(&payload.category.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Unknown category '{}'",
            payload.category
        )));
    }
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let request = sqlx::query_as::<_, ServiceRequest>(
        r#"
        INSERT INTO service_requests
            (id, site_id, resident_id, category, title, description, status,
             scheduled_date, qr_start_used, qr_completion_used, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, false, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(site_id)
    .bind(auth_user.user_id)
    .bind(&payload.category)
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.scheduled_date)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        "Service request {} ({}) opened by resident {}",
        request.id,
        request.category,
        auth_user.user_id
    );

    // Advisory: a push failure never blocks the request
    push::notify_department(
        &pool,
        site_id,
        Some(&request.category),
        Dispatch::new(
            "New service request",
            format!("{}: {}", request.category, request.title),
            json!({ "type": "request_created", "request_id": request.id }),
        ),
    )
    .await;

    Ok(ApiResponse::created(request))
}

/// GET /api/requests/:id - Fetch one service request
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ServiceRequest> {
    let pool = DatabaseManager::pool().await?;
    let request = request_service::get_request(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Service request {} not found", id)))?;

    authorize(&auth_user, Some(&scope_of(&request)), Action::ViewResource)?;

    Ok(ApiResponse::success(request))
}

/// PATCH /api/requests/:id - Update a service request
///
/// Residents may edit descriptive fields while the request is still
/// pending; the same edit against a later status is acknowledged but
/// ignored. Staff overwrite status and assignment/cost fields for
/// requests at their own site.
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRequest>,
) -> ApiResult<ServiceRequest> {
    let pool = DatabaseManager::pool().await?;
    let request = request_service::get_request(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Service request {} not found", id)))?;

    let scope = scope_of(&request);
    let current = ResourceStatus::parse(ResourceKind::ServiceRequest, &request.status)?;

    if auth_user.role == Role::Resident {
        authorize(&auth_user, Some(&scope), Action::EditDetails)?;

        if payload.status.is_some()
            || payload.assigned_to.is_some()
            || payload.assigned_department.is_some()
            || payload.estimated_cost.is_some()
            || payload.actual_cost.is_some()
        {
            return Err(ApiError::forbidden("Residents cannot change status or assignment"));
        }

        // Past the editable window the update is silently ignored
        if !current.is_initial() {
            return Ok(ApiResponse::success(request));
        }

        let updated = sqlx::query_as::<_, ServiceRequest>(
            r#"
            UPDATE service_requests
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                scheduled_date = COALESCE($4, scheduled_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.scheduled_date)
        .fetch_one(&pool)
        .await?;

        return Ok(ApiResponse::success(updated));
    }

    // Staff / superadmin path
    match payload.status.as_deref() {
        Some(raw_status) => {
            // Invalid values are rejected before any write
            let next = ResourceStatus::parse(ResourceKind::ServiceRequest, raw_status)?;
            authorize(&auth_user, Some(&scope), Action::SetStatus)?;
            ResourceStatus::check_transition(current, next)?;

            let updated = request_service::apply_status(
                &pool,
                id,
                next,
                StatusUpdate {
                    assigned_to: payload.assigned_to,
                    assigned_department: payload.assigned_department,
                    estimated_cost: payload.estimated_cost,
                    actual_cost: payload.actual_cost,
                    scheduled_date: payload.scheduled_date,
                },
            )
            .await?;

            tracing::info!(
                "Service request {} moved {} -> {} by {}",
                id,
                current.as_str(),
                next.as_str(),
                auth_user.user_id
            );

            push::notify_user(
                &pool,
                updated.resident_id,
                Dispatch::new(
                    "Service request update",
                    format!("Your {} request is now {}", updated.category, next.as_str()),
                    json!({ "type": "request_status", "request_id": updated.id, "status": next.as_str() }),
                ),
            )
            .await;

            Ok(ApiResponse::success(updated))
        }
        None => {
            authorize(&auth_user, Some(&scope), Action::EditDetails)?;

            let updated = sqlx::query_as::<_, ServiceRequest>(
                r#"
                UPDATE service_requests
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    scheduled_date = COALESCE($4, scheduled_date),
                    assigned_to = COALESCE($5, assigned_to),
                    assigned_department = COALESCE($6, assigned_department),
                    estimated_cost = COALESCE($7, estimated_cost),
                    actual_cost = COALESCE($8, actual_cost),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(payload.title)
            .bind(payload.description)
            .bind(payload.scheduled_date)
            .bind(payload.assigned_to)
            .bind(payload.assigned_department)
            .bind(payload.estimated_cost)
            .bind(payload.actual_cost)
            .fetch_one(&pool)
            .await?;

            Ok(ApiResponse::success(updated))
        }
    }
}

/// DELETE /api/requests/:id - Generic delete
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;
    let request = request_service::get_request(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Service request {} not found", id)))?;

    authorize(&auth_user, Some(&scope_of(&request)), Action::DeleteResource)?;

    sqlx::query("DELETE FROM service_requests WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
