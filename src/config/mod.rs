use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub integrations: IntegrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Shared secret for HMAC-signed QR tokens
    pub qr_secret: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Credentials for the external SaaS collaborators. All of these are
/// optional at startup: an unset value disables the integration and the
/// corresponding endpoints report the gateway as unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub firebase_project_id: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub livekit_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms =
                v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("QR_SECRET") {
            self.security.qr_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Integration overrides
        if let Ok(v) = env::var("FIREBASE_PROJECT_ID") {
            self.integrations.firebase_project_id = v;
        }
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            self.integrations.stripe_secret_key = v;
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            self.integrations.stripe_webhook_secret = v;
        }
        if let Ok(v) = env::var("LIVEKIT_URL") {
            self.integrations.livekit_url = v;
        }
        if let Ok(v) = env::var("LIVEKIT_API_KEY") {
            self.integrations.livekit_api_key = v;
        }
        if let Ok(v) = env::var("LIVEKIT_API_SECRET") {
            self.integrations.livekit_api_secret = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            security: SecurityConfig {
                jwt_secret: "eden-dev-jwt-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                qr_secret: "eden-dev-qr-secret".to_string(),
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            integrations: IntegrationConfig::unset(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                qr_secret: String::new(),
                enable_cors: true,
                cors_origins: vec!["https://staging.edenliving.app".to_string()],
            },
            integrations: IntegrationConfig::unset(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 1000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                qr_secret: String::new(),
                enable_cors: true,
                cors_origins: vec!["https://app.edenliving.app".to_string()],
            },
            integrations: IntegrationConfig::unset(),
        }
    }
}

impl IntegrationConfig {
    fn unset() -> Self {
        Self {
            firebase_project_id: String::new(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            livekit_url: String::new(),
            livekit_api_key: String::new(),
            livekit_api_secret: String::new(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 24 * 7);
        assert!(config.security.enable_cors);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        // Production refuses to fall back to baked-in secrets
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.security.qr_secret.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 4);
    }
}
