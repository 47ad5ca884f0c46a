//! Atelier storefront library.
//!
//! The order-placement core of the storefront: checkout (validation,
//! identity resolution, the atomic order transaction), order lookup, and
//! the HTTP API around them. Exposed as a library so the binary, the CLI
//! and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
