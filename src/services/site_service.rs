use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Site;

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database manager error: {0}")]
    DatabaseManager(#[from] DatabaseError),

    #[error("Site already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid site name: {0}")]
    InvalidName(String),
}

pub struct SiteService {
    pool: PgPool,
}

impl SiteService {
    pub async fn new() -> Result<Self, SiteError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Register a new site
    pub async fn create_site(&self, name: &str, timezone: &str) -> Result<Site, SiteError> {
        self.validate_site_name(name)?;

        if self.site_exists(name).await? {
            return Err(SiteError::AlreadyExists(name.to_string()));
        }

        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (id, name, timezone, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, true, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(timezone)
        .fetch_one(&self.pool)
        .await?;

        Ok(site)
    }

    /// Validate site name follows rules
    fn validate_site_name(&self, name: &str) -> Result<(), SiteError> {
        if name.trim().len() < 2 {
            return Err(SiteError::InvalidName(
                "Site name must be at least 2 characters".to_string(),
            ));
        }

        if name.len() > 100 {
            return Err(SiteError::InvalidName(
                "Site name must be less than 100 characters".to_string(),
            ));
        }

        Ok(())
    }

    async fn site_exists(&self, name: &str) -> Result<bool, SiteError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sites WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Get site by id
    pub async fn get_site(&self, id: Uuid) -> Result<Option<Site>, SiteError> {
        let site = sqlx::query_as::<_, Site>(
            "SELECT * FROM sites WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    /// List all sites
    pub async fn list_sites(&self) -> Result<Vec<Site>, SiteError> {
        let sites = sqlx::query_as::<_, Site>(
            "SELECT * FROM sites WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sites)
    }

    /// Activate or deactivate a site. Inactive sites reject all site-scoped
    /// traffic at the middleware layer.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<Site>, SiteError> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            UPDATE sites
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }
}
