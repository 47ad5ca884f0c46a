//! Order aggregate types.
//!
//! An order is always written and read as one unit: the header, its items,
//! the shipping snapshot and the payment snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::{
    CardExpiry, Email, MaskedCardNumber, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Quantity, UserId,
};

// =============================================================================
// Write side
// =============================================================================

/// Validated shipping form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

impl ShippingDetails {
    /// Name used for guest accounts.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Payment snapshot as persisted: never more than the last four digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub masked_card_number: MaskedCardNumber,
    pub expiry: CardExpiry,
}

/// One priced line of a draft order (one per distinct product).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    /// Unit price read from the catalogue, never from the client.
    pub unit_price: Price,
}

impl OrderLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// In-memory order built by the assembler, not yet persisted.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Lines in submission order.
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub payment: PaymentDetails,
}

impl OrderDraft {
    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }
}

/// Order header row to insert.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total: Price,
    pub is_guest: bool,
}

/// Order item row to insert.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Price,
}

// =============================================================================
// Read side
// =============================================================================

/// The owner of an order, included in admin views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderOwner {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A persisted order item with the captured price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    pub price: Price,
}

/// A materialised order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Price,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OrderOwner,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingDetails,
    pub payment: PaymentDetails,
}

/// Which orders a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    /// Every order (admin).
    All,
    /// Orders owned by one user.
    OwnedBy(UserId),
}

impl OrderFilter {
    /// Whether `order` belongs in this listing.
    #[must_use]
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::OwnedBy(user_id) => order.user_id == *user_id,
        }
    }
}
