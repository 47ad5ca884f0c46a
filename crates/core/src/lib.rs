//! Atelier Core - Shared types library.
//!
//! This crate provides the value types used by every Atelier component:
//! - `storefront` - Public storefront API (checkout and order lookup)
//! - `cli` - Command-line tools for migrations and catalogue seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Anything that reaches the checkout transaction has
//! already been parsed into one of these types, so invalid quantities,
//! malformed emails or raw card numbers cannot travel further than the
//! request boundary.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices, quantities,
//!   statuses and payment card data

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
