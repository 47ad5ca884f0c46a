//! `PostgreSQL` implementation of the store traits.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use atelier_core::{Email, OrderId, OrderStatus, ProductId, Quantity};

use super::orders::{self, OrderRepository};
use super::products::{self, ProductRepository};
use super::store::{
    CatalogStore, OrderReader, OrderStore, OrderTransaction, StockDecrement, StorefrontStore,
    UserStore,
};
use super::users::UserRepository;
use super::RepositoryError;
use crate::models::{
    NewGuestUser, NewOrder, NewOrderItem, Order, OrderFilter, PaymentDetails, Product,
    ShippingDetails, User,
};

/// Store handle backed by a `PostgreSQL` pool.
///
/// Cloning is cheap; each checkout borrows one pooled connection for the
/// lifetime of its transaction.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// An open order transaction.
///
/// `sqlx` rolls the transaction back when this is dropped uncommitted, which
/// also covers a client disconnect cancelling the request future.
pub struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_email(email).await
    }

    async fn create_guest_user(&self, guest: &NewGuestUser) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create_guest(guest).await
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_many(ids).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    type Transaction = PgOrderTransaction;

    async fn begin(&self) -> Result<PgOrderTransaction, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgOrderTransaction { tx })
    }
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        products::lock_for_update(&mut self.tx, ids).await
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockDecrement, RepositoryError> {
        products::decrement_stock(&mut self.tx, product_id, quantity).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        orders::insert_order(&mut self.tx, order).await
    }

    async fn insert_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError> {
        orders::insert_items(&mut self.tx, order_id, items).await
    }

    async fn insert_shipping(
        &mut self,
        order_id: OrderId,
        shipping: &ShippingDetails,
    ) -> Result<(), RepositoryError> {
        orders::insert_shipping(&mut self.tx, order_id, shipping).await
    }

    async fn insert_payment(
        &mut self,
        order_id: OrderId,
        payment: &PaymentDetails,
    ) -> Result<(), RepositoryError> {
        orders::insert_payment(&mut self.tx, order_id, payment).await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderReader for PgStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list(filter).await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        OrderRepository::new(&self.pool)
            .update_status(id, from, to)
            .await
    }
}

#[async_trait]
impl StorefrontStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
