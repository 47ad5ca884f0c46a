//! Catalogue product as seen by checkout.

use atelier_core::{Price, ProductId};

/// A product with its current price and available stock.
///
/// Read twice during checkout: once by the assembler (advisory) and once
/// under a row lock inside the order transaction (authoritative).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Price,
    /// Units available; never negative.
    pub stock: i32,
}
