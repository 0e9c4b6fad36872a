// User management across sites. Superadmin only.

use axum::{
    extract::{Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub site_id: Option<Uuid>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub site_id: Option<Uuid>,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

/// POST /api/root/users - Create an account
pub async fn user_create(Json(payload): Json<CreateUser>) -> ApiResult<User> {
    let role = Role::parse(&payload.role)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown role '{}'", payload.role)))?;

    // Everyone except superadmins belongs to exactly one site
    if role != Role::Superadmin && payload.site_id.is_none() {
        return Err(ApiError::bad_request("site_id is required for this role"));
    }

    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(ApiError::bad_request("a valid email is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal_server_error("Failed to create account")
    })?;

    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users
            (id, site_id, name, email, password_hash, role, department, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, true, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.site_id)
    .bind(payload.name.trim())
    .bind(payload.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(role.as_str())
    .bind(&payload.department)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict(format!("Email '{}' is already registered", payload.email.trim()))
        } else {
            e.into()
        }
    })?;

    tracing::info!("User {} created with role {}", user.email, user.role);
    Ok(ApiResponse::created(user))
}

/// GET /api/root/users - List accounts, optionally filtered by site
pub async fn user_list(Query(query): Query<UserQuery>) -> ApiResult<Vec<User>> {
    let pool = DatabaseManager::pool().await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR site_id = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(query.site_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(users))
}

/// PATCH /api/root/users/:id - Update an account
pub async fn user_update(Path(id): Path<Uuid>, Json(payload): Json<UpdateUser>) -> ApiResult<User> {
    if let Some(role) = payload.role.as_deref() {
        if Role::parse(role).is_none() {
            return Err(ApiError::bad_request(format!("Unknown role '{}'", role)));
        }
    }

    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            role = COALESCE($3, role),
            department = COALESCE($4, department),
            is_active = COALESCE($5, is_active),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.name)
    .bind(payload.role)
    .bind(payload.department)
    .bind(payload.is_active)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;

    Ok(ApiResponse::success(user))
}

/// DELETE /api/root/users/:id - Soft-delete an account
pub async fn user_delete(Path(id): Path<Uuid>) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query(
        r#"
        UPDATE users
        SET deleted_at = NOW(), is_active = false, updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(format!("User {} not found", id)));
    }

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
