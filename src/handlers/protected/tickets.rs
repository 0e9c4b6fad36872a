use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action, ResourceScope};
use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::ticket::{Ticket, TicketStatus};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateTicket {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicket {
    pub subject: Option<String>,
    pub body: Option<String>,
    // Staff-only fields
    pub status: Option<String>,
    pub assigned_to: Option<Uuid>,
}

fn scope_of(ticket: &Ticket) -> ResourceScope {
    ResourceScope {
        site_id: ticket.site_id,
        owner_id: ticket.resident_id,
    }
}

async fn get_ticket(pool: &sqlx::PgPool, id: Uuid) -> Result<Ticket, ApiError> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Ticket {} not found", id)))
}

/// GET /api/tickets - List helpdesk tickets visible to the actor
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Ticket>> {
    let pool = DatabaseManager::pool().await?;

    let tickets = match auth_user.role {
        Role::Resident => {
            sqlx::query_as::<_, Ticket>(
                "SELECT * FROM tickets WHERE resident_id = $1 ORDER BY created_at DESC",
            )
            .bind(auth_user.user_id)
            .fetch_all(&pool)
            .await?
        }
        Role::Staff | Role::SiteAdmin => {
            sqlx::query_as::<_, Ticket>(
                "SELECT * FROM tickets WHERE site_id = $1 ORDER BY created_at DESC",
            )
            .bind(auth_user.site_id)
            .fetch_all(&pool)
            .await?
        }
        Role::Superadmin => {
            sqlx::query_as::<_, Ticket>("SELECT * FROM tickets ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(ApiResponse::success(tickets))
}

/// POST /api/tickets - Resident opens a helpdesk ticket
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateTicket>,
) -> ApiResult<Ticket> {
    if auth_user.role != Role::Resident {
        return Err(ApiError::forbidden("Only residents open helpdesk tickets"));
    }
    let site_id = auth_user
        .site_id
        .ok_or_else(|| ApiError::forbidden("Account is not attached to a site"))?;

    if payload.subject.trim().is_empty() {
        return Err(ApiError::bad_request("subject is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let ticket = sqlx::query_as::<_, Ticket>(
        r#"
        INSERT INTO tickets (id, site_id, resident_id, subject, body, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'open', NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(site_id)
    .bind(auth_user.user_id)
    .bind(payload.subject.trim())
    .bind(&payload.body)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(ticket))
}

/// GET /api/tickets/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Ticket> {
    let pool = DatabaseManager::pool().await?;
    let ticket = get_ticket(&pool, id).await?;

    authorize(&auth_user, Some(&scope_of(&ticket)), Action::ViewResource)?;

    Ok(ApiResponse::success(ticket))
}

/// PATCH /api/tickets/:id - Update a ticket
///
/// Residents may reword their own ticket while it is still open; staff
/// assign and move it through open -> in_progress -> resolved (closed
/// from anywhere).
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicket>,
) -> ApiResult<Ticket> {
    let pool = DatabaseManager::pool().await?;
    let ticket = get_ticket(&pool, id).await?;
    let scope = scope_of(&ticket);

    if auth_user.role == Role::Resident {
        authorize(&auth_user, Some(&scope), Action::EditDetails)?;

        if payload.status.is_some() || payload.assigned_to.is_some() {
            return Err(ApiError::forbidden("Residents cannot change status or assignment"));
        }

        if ticket.status != TicketStatus::Open.as_str() {
            return Ok(ApiResponse::success(ticket));
        }

        let updated = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET subject = COALESCE($2, subject),
                body = COALESCE($3, body),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.subject)
        .bind(payload.body)
        .fetch_one(&pool)
        .await?;

        return Ok(ApiResponse::success(updated));
    }

    if let Some(raw_status) = payload.status.as_deref() {
        if TicketStatus::parse(raw_status).is_none() {
            return Err(ApiError::bad_request(format!(
                "Unknown ticket status '{}'",
                raw_status
            )));
        }
    }

    authorize(&auth_user, Some(&scope), Action::SetStatus)?;

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET status = COALESCE($2, status),
            assigned_to = COALESCE($3, assigned_to),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .bind(payload.assigned_to)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(updated))
}
