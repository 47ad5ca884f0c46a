//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `checkout` - Order placement (validation, identity, atomic commit)
//! - `orders` - Order lookup and admin status changes

pub mod checkout;
pub mod orders;

pub use checkout::{CheckoutError, CheckoutService, PlaceOrderRequest};
pub use orders::{OrderQueryError, OrderQueryService, Requester};
