//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span, Sentry scope and response)
//! 4. Session layer (tower-sessions with `PostgreSQL` store, signed cookie)
//! 5. Rate limiting on `/api/orders` (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, set_current_user};
pub use rate_limit::order_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_layer};
