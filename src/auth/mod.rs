pub mod policy;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

/// Actor roles, from least to most privileged. Residents belong to a site,
/// staff and site admins are scoped to one site, superadmins are site-less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Resident,
    Staff,
    SiteAdmin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Staff => "staff",
            Role::SiteAdmin => "site_admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "resident" => Some(Role::Resident),
            "staff" => Some(Role::Staff),
            "site_admin" => Some(Role::SiteAdmin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    /// Staff and site admins share the same site-scoped privileges
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::SiteAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub site_id: Option<Uuid>,
    pub role: Role,
    pub department: Option<String>,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        site_id: Option<Uuid>,
        role: Role,
        department: Option<String>,
        name: String,
    ) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            site_id,
            role,
            department,
            name,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, &claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_round_trips() {
        for role in [Role::Resident, Role::Staff, Role::SiteAdmin, Role::Superadmin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("manager"), None);
    }

    #[test]
    fn staff_grouping() {
        assert!(Role::Staff.is_staff());
        assert!(Role::SiteAdmin.is_staff());
        assert!(!Role::Resident.is_staff());
        assert!(!Role::Superadmin.is_staff());
    }
}
