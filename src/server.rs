use axum::{middleware, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::auth::{jwt_auth_middleware, require_superadmin_middleware};
use crate::middleware::validate_site::validate_site_middleware;

pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes())
        // Superadmin back-office
        .merge(elevated_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::public;

    Router::new()
        .route("/auth/login", post(public::auth::login))
        // Payment processor success callback, signature-verified
        .route("/webhooks/stripe", post(public::stripe::stripe_webhook))
}

fn protected_routes() -> Router {
    use axum::routing::{delete, post, put};
    use handlers::protected;

    Router::new()
        // Session
        .route("/api/auth/whoami", get(protected::auth::whoami))
        .route("/api/auth/refresh", put(protected::auth::refresh))
        // Service requests
        .route(
            "/api/requests",
            get(protected::requests::list).post(protected::requests::create),
        )
        .route(
            "/api/requests/:id",
            get(protected::requests::get)
                .patch(protected::requests::update)
                .delete(protected::requests::delete),
        )
        // Two-phase QR confirmation
        .route("/api/qr/requests/:id/:phase", post(protected::qr::issue))
        .route("/api/qr/scan", post(protected::qr::scan))
        // Kitchen orders
        .route(
            "/api/orders",
            get(protected::orders::list).post(protected::orders::create),
        )
        .route(
            "/api/orders/:id",
            get(protected::orders::get).patch(protected::orders::update),
        )
        // Helpdesk
        .route(
            "/api/tickets",
            get(protected::tickets::list).post(protected::tickets::create),
        )
        .route(
            "/api/tickets/:id",
            get(protected::tickets::get).patch(protected::tickets::update),
        )
        // Billing
        .route("/api/billing/invoices", get(protected::billing::list))
        .route("/api/billing/invoices/:id/pay", post(protected::billing::pay))
        // Emergency SOS
        .route("/api/sos", post(protected::sos::create))
        // Push delivery tokens
        .route("/api/devices", post(protected::devices::register))
        .route("/api/devices/:token", delete(protected::devices::unregister))
        // Innermost first: site validation runs after JWT auth
        .route_layer(middleware::from_fn(validate_site_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn elevated_routes() -> Router {
    use axum::routing::{patch, post};
    use handlers::elevated::root;

    Router::new()
        // Site management
        .route(
            "/api/root/sites",
            get(root::sites::site_list).post(root::sites::site_create),
        )
        .route(
            "/api/root/sites/:id",
            get(root::sites::site_show).patch(root::sites::site_update),
        )
        // User management
        .route(
            "/api/root/users",
            get(root::users::user_list).post(root::users::user_create),
        )
        .route(
            "/api/root/users/:id",
            patch(root::users::user_update).delete(root::users::user_delete),
        )
        // Externally-triggered periodic work
        .route("/api/root/invoices/sweep", post(root::sweep::invoice_sweep))
        .route_layer(middleware::from_fn(require_superadmin_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Eden Living API",
            "version": version,
            "description": "Multi-site senior living community backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login (public - token acquisition)",
                "webhooks": "/webhooks/stripe (public - signature verified)",
                "session": "/api/auth/* (protected)",
                "requests": "/api/requests[/:id] (protected)",
                "qr": "/api/qr/* (protected)",
                "orders": "/api/orders[/:id] (protected)",
                "tickets": "/api/tickets[/:id] (protected)",
                "billing": "/api/billing/* (protected)",
                "sos": "/api/sos (protected)",
                "devices": "/api/devices (protected)",
                "root": "/api/root/* (superadmin only)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
