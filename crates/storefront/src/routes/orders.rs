//! Order API handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::{OrderId, OrderStatus};

use crate::db::StorefrontStore;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::Order;
use crate::services::{CheckoutService, OrderQueryService, PlaceOrderRequest, Requester};
use crate::state::AppState;

/// Query string for single-order lookups.
#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    /// Shipping email, required when nobody is signed in.
    pub email: Option<String>,
}

/// `PATCH /api/orders/{id}` body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Place an order for the signed-in user or a guest.
#[instrument(skip_all, fields(user_id = tracing::field::Empty))]
pub async fn place<S: StorefrontStore>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    payload: std::result::Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let order = CheckoutService::new(state.store())
        .place_order(user.as_ref(), &request)
        .await?;

    tracing::Span::current().record("user_id", order.user_id.as_i32());
    add_breadcrumb(
        "checkout",
        "Order placed",
        &[
            ("order_id", order.id.to_string()),
            ("total", order.total.to_string()),
        ],
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// List the caller's orders, or every order for admins.
pub async fn list<S: StorefrontStore>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderQueryService::new(state.store())
        .list(&Requester::User(user))
        .await?;
    Ok(Json(orders))
}

/// Fetch one order. Anonymous callers must pass `?email=`.
pub async fn show<S: StorefrontStore>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    path: std::result::Result<Path<OrderId>, PathRejection>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Order>> {
    let Path(id) = path.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let order = OrderQueryService::new(state.store())
        .get(id, &Requester::new(user, query.email))
        .await?;
    Ok(Json(order))
}

/// Change an order's status (admin only).
pub async fn update_status<S: StorefrontStore>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    path: std::result::Result<Path<OrderId>, PathRejection>,
    payload: std::result::Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = path.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Json(update) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let order = OrderQueryService::new(state.store())
        .update_status(id, update.status, &Requester::User(user))
        .await?;
    Ok(Json(order))
}
