//! Wire shape of an order placement request.
//!
//! Fields default to empty so that a missing field is reported as a
//! validation error naming it, instead of a generic body rejection.

use std::fmt;

use serde::Deserialize;

use atelier_core::ProductId;

/// `POST /api/orders` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<CartItemInput>,
    #[serde(default)]
    pub shipping_info: ShippingForm,
    #[serde(default)]
    pub payment_info: PaymentForm,
}

/// One submitted cart line.
///
/// Any client-side `price` is ignored; prices always come from the catalogue.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Shipping form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

/// Payment form as submitted.
///
/// Implements `Debug` manually so the card number never reaches a log.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentForm {
    pub card_number: String,
    pub expiry_date: String,
}

impl fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentForm")
            .field("card_number", &"[REDACTED]")
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}
