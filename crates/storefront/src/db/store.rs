//! Persistence seams used by the checkout and order services.
//!
//! Services receive an explicit store handle instead of reaching for a
//! global pool. [`super::PgStore`] is the production implementation; the
//! in-memory [`super::MemoryStore`] backs the tests.

use async_trait::async_trait;

use atelier_core::{Email, OrderId, OrderStatus, ProductId, Quantity};

use super::RepositoryError;
use crate::models::{
    NewGuestUser, NewOrder, NewOrderItem, Order, OrderFilter, PaymentDetails, Product,
    ShippingDetails, User,
};

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was reduced; `remaining` units are left.
    Applied { remaining: i32 },
    /// Fewer than the requested units were left; nothing changed.
    Insufficient { available: i32 },
}

/// User lookups and guest account creation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by normalised email.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a guest account.
    ///
    /// Must return [`RepositoryError::Conflict`] when the email is taken,
    /// including when another request inserted it a moment earlier.
    async fn create_guest_user(&self, guest: &NewGuestUser) -> Result<User, RepositoryError>;
}

/// Read-only catalogue access.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch the products with the given ids. Missing ids are simply absent
    /// from the result.
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;
}

/// Opens order transactions.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Transaction handle type.
    type Transaction: OrderTransaction;

    /// Begin an atomic unit of work.
    async fn begin(&self) -> Result<Self::Transaction, RepositoryError>;
}

/// One atomic order-placement unit of work.
///
/// Nothing written through this handle is visible to other readers until
/// [`OrderTransaction::commit`] succeeds. Dropping the handle without
/// committing discards every write.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Lock the given product rows for the rest of the transaction and
    /// return their current price and stock.
    ///
    /// Rows are locked in ascending id order regardless of the order of
    /// `ids`, so two carts naming the same products in different orders
    /// cannot deadlock.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Decrement stock only if at least `quantity` units remain.
    ///
    /// When the precondition fails nothing changes and the stock actually
    /// left at that moment is reported (zero for an unknown product).
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockDecrement, RepositoryError>;

    /// Insert the order header with status `PENDING`.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError>;

    /// Insert the order's items.
    async fn insert_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError>;

    /// Insert the shipping snapshot.
    async fn insert_shipping(
        &mut self,
        order_id: OrderId,
        shipping: &ShippingDetails,
    ) -> Result<(), RepositoryError>;

    /// Insert the masked payment snapshot.
    async fn insert_payment(
        &mut self,
        order_id: OrderId,
        payment: &PaymentDetails,
    ) -> Result<(), RepositoryError>;

    /// Make every write of this transaction durable and visible.
    async fn commit(self) -> Result<(), RepositoryError>;
}

/// Materialised order reads and admin status changes.
#[async_trait]
pub trait OrderReader: Send + Sync {
    /// Load one order aggregate.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// List order aggregates, newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError>;

    /// Compare-and-set the status of an order.
    ///
    /// Returns `false` if the order is no longer in status `from`.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError>;
}

/// Everything the storefront services need from persistence.
#[async_trait]
pub trait StorefrontStore:
    UserStore + CatalogStore + OrderStore + OrderReader + Clone + 'static
{
    /// Cheap connectivity check used by the readiness check.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
