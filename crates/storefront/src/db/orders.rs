//! Order repository: aggregate inserts (inside the checkout transaction) and
//! the typed read path.
//!
//! Reads fetch headers with their 1:1 snapshots in one query and the items
//! in a second query, then assemble the nested aggregate in process.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use atelier_core::{
    CardExpiry, Email, MaskedCardNumber, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Quantity, UserId,
};

use super::RepositoryError;
use crate::models::{
    NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderOwner, PaymentDetails,
    ShippingDetails,
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Order header joined with owner, shipping and payment.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    status: OrderStatus,
    total: Decimal,
    is_guest: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: String,
    owner_email: String,
    first_name: String,
    last_name: String,
    shipping_email: String,
    address: String,
    city: String,
    postal_code: String,
    masked_card_number: String,
    expiry: String,
}

/// Order item joined with the product name.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

fn corrupt(order_id: i32, what: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::DataCorruption(format!("order {order_id}: invalid {what}: {err}"))
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem, RepositoryError> {
        Ok(OrderItem {
            id: OrderItemId::new(self.id),
            product_id: ProductId::new(self.product_id),
            product_name: self.product_name,
            quantity: Quantity::new(i64::from(self.quantity))
                .map_err(|e| corrupt(self.order_id, "quantity", e))?,
            price: Price::new(self.price).map_err(|e| corrupt(self.order_id, "price", e))?,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let id = self.id;

        Ok(Order {
            id: OrderId::new(id),
            user_id: UserId::new(self.user_id),
            status: self.status,
            total: Price::new(self.total).map_err(|e| corrupt(id, "total", e))?,
            is_guest: self.is_guest,
            created_at: self.created_at,
            updated_at: self.updated_at,
            owner: OrderOwner {
                id: UserId::new(self.user_id),
                name: self.owner_name,
                email: Email::parse(&self.owner_email)
                    .map_err(|e| corrupt(id, "owner email", e))?,
            },
            items,
            shipping: ShippingDetails {
                first_name: self.first_name,
                last_name: self.last_name,
                email: Email::parse(&self.shipping_email)
                    .map_err(|e| corrupt(id, "shipping email", e))?,
                address: self.address,
                city: self.city,
                postal_code: self.postal_code,
            },
            payment: PaymentDetails {
                masked_card_number: MaskedCardNumber::from_stored(&self.masked_card_number)
                    .map_err(|e| corrupt(id, "card", e))?,
                expiry: CardExpiry::parse(&self.expiry).map_err(|e| corrupt(id, "expiry", e))?,
            },
        })
    }
}

// =============================================================================
// Repository (read path)
// =============================================================================

/// Repository for order reads and status changes.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a single order aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.fetch(Some(id), None).await?;
        Ok(orders.pop())
    }

    /// List order aggregates, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        match filter {
            OrderFilter::All => self.fetch(None, None).await,
            OrderFilter::OwnedBy(user_id) => self.fetch(None, Some(user_id)).await,
        }
    }

    /// Compare-and-set an order's status.
    ///
    /// Returns `false` if the order does not exist or is not in `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fetch(
        &self,
        order_id: Option<OrderId>,
        user_id: Option<UserId>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, o.status, o.total, o.is_guest,
                   o.created_at, o.updated_at,
                   u.name AS owner_name, u.email AS owner_email,
                   s.first_name, s.last_name, s.email AS shipping_email,
                   s.address, s.city, s.postal_code,
                   p.masked_card_number, p.expiry
            FROM storefront.orders o
            JOIN storefront.users u ON u.id = o.user_id
            JOIN storefront.order_shipping s ON s.order_id = o.id
            JOIN storefront.order_payment p ON p.order_id = o.id
            WHERE ($1::INTEGER IS NULL OR o.id = $1)
              AND ($2::INTEGER IS NULL OR o.user_id = $2)
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT i.id, i.order_id, i.product_id, pr.name AS product_name,
                   i.quantity, i.price
            FROM storefront.order_items i
            JOIN storefront.products pr ON pr.id = i.product_id
            WHERE i.order_id = ANY($1)
            ORDER BY i.order_id, i.id
            ",
        )
        .bind(&order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row.into_item()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

// =============================================================================
// Transactional inserts
// =============================================================================

/// Insert the order header (status `PENDING`) and return its id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<OrderId, RepositoryError> {
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO storefront.orders (user_id, status, total, is_guest)
        VALUES ($1, 'PENDING', $2, $3)
        RETURNING id
        ",
    )
    .bind(order.user_id)
    .bind(order.total)
    .bind(order.is_guest)
    .fetch_one(&mut *conn)
    .await?;

    Ok(OrderId::new(id))
}

/// Insert order items.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<(), RepositoryError> {
    for item in items {
        sqlx::query(
            r"
            INSERT INTO storefront.order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity.get())
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Insert the shipping snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_shipping(
    conn: &mut PgConnection,
    order_id: OrderId,
    shipping: &ShippingDetails,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.order_shipping
            (order_id, first_name, last_name, email, address, city, postal_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(order_id)
    .bind(&shipping.first_name)
    .bind(&shipping.last_name)
    .bind(&shipping.email)
    .bind(&shipping.address)
    .bind(&shipping.city)
    .bind(&shipping.postal_code)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert the masked payment snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_payment(
    conn: &mut PgConnection,
    order_id: OrderId,
    payment: &PaymentDetails,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.order_payment (order_id, masked_card_number, expiry)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(order_id)
    .bind(payment.masked_card_number.as_str())
    .bind(payment.expiry.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
