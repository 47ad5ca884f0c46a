//! Domain models for the storefront.
//!
//! These are validated domain types, separate from the database row types
//! in [`crate::db`]. Anything serialised to API clients lives here.

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::{
    NewOrder, NewOrderItem, Order, OrderDraft, OrderFilter, OrderItem, OrderLine, OrderOwner,
    PaymentDetails, ShippingDetails,
};
pub use product::Product;
pub use session::{CurrentUser, session_keys};
pub use user::{NewGuestUser, User};
