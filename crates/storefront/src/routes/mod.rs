//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                 - Liveness check
//! GET   /health/ready           - Readiness check (database ping)
//!
//! # Orders
//! POST  /api/orders             - Place an order (session user or guest)
//! GET   /api/orders             - Own orders, or all orders for admins
//! GET   /api/orders/{id}        - One order (guests pass ?email=)
//! PATCH /api/orders/{id}        - Change status (admin)
//! ```

pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::StorefrontStore;
use crate::state::AppState;

/// Create the health check routes.
pub fn health_routes<S: StorefrontStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
}

/// Create the order API routes, to be nested under `/api/orders`.
pub fn order_routes<S: StorefrontStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", post(orders::place::<S>).get(orders::list::<S>))
        .route(
            "/{id}",
            get(orders::show::<S>).patch(orders::update_status::<S>),
        )
}

/// Create all routes for the storefront, without rate limiting.
pub fn routes<S: StorefrontStore>() -> Router<AppState<S>> {
    Router::new()
        .merge(health_routes())
        .nest("/api/orders", order_routes())
}
