//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; responses are JSON of the form
//! `{"error": "<code>", "message": "<text>", ...details}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::services::{CheckoutError, OrderQueryError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order lookup or status change failed.
    #[error("Order error: {0}")]
    Orders(#[from] OrderQueryError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Checkout(err) => matches!(
                err,
                CheckoutError::IdentityResolutionFailed(_) | CheckoutError::Transaction(_)
            ),
            Self::Orders(err) => matches!(err, OrderQueryError::Repository(_)),
            Self::BadRequest(_) => false,
        }
    }

    /// Status code, machine-readable code, client-facing message and any
    /// extra fields for the body.
    fn parts(&self) -> (StatusCode, &'static str, String, Map<String, Value>) {
        let mut details = Map::new();

        let (status, code, message) = match self {
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => {
                    (StatusCode::BAD_REQUEST, "empty_cart", err.to_string())
                }
                CheckoutError::InvalidShippingInfo { field, .. } => {
                    details.insert("field".into(), json!(field));
                    (StatusCode::BAD_REQUEST, "invalid_shipping_info", err.to_string())
                }
                CheckoutError::InvalidPaymentInfo { field, .. } => {
                    details.insert("field".into(), json!(field));
                    (StatusCode::BAD_REQUEST, "invalid_payment_info", err.to_string())
                }
                CheckoutError::InvalidQuantity {
                    product_id,
                    quantity,
                } => {
                    details.insert("productId".into(), json!(product_id));
                    details.insert("quantity".into(), json!(quantity));
                    (StatusCode::BAD_REQUEST, "invalid_quantity", err.to_string())
                }
                CheckoutError::ProductNotFound(product_id) => {
                    details.insert("productId".into(), json!(product_id));
                    (StatusCode::NOT_FOUND, "product_not_found", err.to_string())
                }
                CheckoutError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                } => {
                    details.insert("productId".into(), json!(product_id));
                    details.insert("available".into(), json!(available));
                    details.insert("requested".into(), json!(requested));
                    details.insert("retryable".into(), json!(true));
                    (StatusCode::CONFLICT, "insufficient_stock", err.to_string())
                }
                CheckoutError::IdentityResolutionFailed(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "identity_resolution_failed",
                    "Could not resolve customer account".to_string(),
                ),
                CheckoutError::Transaction(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "transaction_failed",
                    "Order could not be placed; nothing was charged or reserved".to_string(),
                ),
            },
            Self::Orders(err) => match err {
                OrderQueryError::NotFound => {
                    (StatusCode::NOT_FOUND, "not_found", err.to_string())
                }
                OrderQueryError::Unauthorized => {
                    (StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
                }
                OrderQueryError::Forbidden => {
                    (StatusCode::FORBIDDEN, "forbidden", err.to_string())
                }
                OrderQueryError::InvalidTransition(transition) => {
                    details.insert("from".into(), json!(transition.from));
                    details.insert("to".into(), json!(transition.to));
                    (StatusCode::CONFLICT, "invalid_transition", err.to_string())
                }
                OrderQueryError::ConcurrentUpdate => {
                    details.insert("retryable".into(), json!(true));
                    (StatusCode::CONFLICT, "concurrent_update", err.to_string())
                }
                OrderQueryError::Repository(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                ),
            },
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message.clone()),
        };

        (status, code, message, details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, code, message, mut body) = self.parts();
        body.insert("error".into(), json!(code));
        body.insert("message".into(), json!(message));

        (status, Json(Value::Object(body))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
