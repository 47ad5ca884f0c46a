//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod card;
pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use card::{CardError, CardExpiry, CardNumber, MaskedCardNumber};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
