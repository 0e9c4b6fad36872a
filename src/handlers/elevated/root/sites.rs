// Site management. All handlers here sit behind the superadmin middleware.

use axum::{extract::Path, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Site;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::site_service::SiteService;

#[derive(Debug, Deserialize)]
pub struct CreateSite {
    pub name: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSite {
    pub is_active: bool,
}

/// POST /api/root/sites - Register a new site
pub async fn site_create(Json(payload): Json<CreateSite>) -> ApiResult<Site> {
    let service = SiteService::new().await?;
    let timezone = payload.timezone.as_deref().unwrap_or("UTC");

    let site = service.create_site(payload.name.trim(), timezone).await?;

    tracing::info!("Site '{}' created ({})", site.name, site.id);
    Ok(ApiResponse::created(site))
}

/// GET /api/root/sites - List all sites
pub async fn site_list() -> ApiResult<Vec<Site>> {
    let service = SiteService::new().await?;
    Ok(ApiResponse::success(service.list_sites().await?))
}

/// GET /api/root/sites/:id - Show one site
pub async fn site_show(Path(id): Path<Uuid>) -> ApiResult<Site> {
    let service = SiteService::new().await?;
    let site = service
        .get_site(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Site {} not found", id)))?;

    Ok(ApiResponse::success(site))
}

/// PATCH /api/root/sites/:id - Activate or deactivate a site
pub async fn site_update(Path(id): Path<Uuid>, Json(payload): Json<UpdateSite>) -> ApiResult<Site> {
    let service = SiteService::new().await?;
    let site = service
        .set_active(id, payload.is_active)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Site {} not found", id)))?;

    tracing::info!("Site '{}' set active={}", site.name, site.is_active);
    Ok(ApiResponse::success(site))
}
