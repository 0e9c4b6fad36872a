pub mod auth;
pub mod stripe;
