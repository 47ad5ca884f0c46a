//! Product repository and the stock operations used inside order transactions.
//!
//! `stock` is only ever written by [`decrement_stock`]; catalogue editing is
//! handled elsewhere.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use atelier_core::{Price, ProductId, Quantity};

use super::{RepositoryError, StockDecrement};
use crate::models::Product;

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    stock: i32,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            stock: row.stock,
        })
    }
}

/// Catalogue entry inserted by the seed command.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: i32,
}

fn raw_ids(ids: &[ProductId]) -> Vec<i32> {
    ids.iter().map(ProductId::as_i32).collect()
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch products by id without locking.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, stock
            FROM storefront.products
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Insert a product unless one with the same name exists.
    ///
    /// Returns `true` if a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_if_absent(&self, product: &NewProduct) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.products (name, description, price, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Lock product rows (`FOR UPDATE`, ascending id) and return their state.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_update(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        r"
        SELECT id, name, price, stock
        FROM storefront.products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(raw_ids(ids))
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Product::try_from).collect()
}

/// Conditional decrement: `stock = stock - qty WHERE stock >= qty`.
///
/// If no row matched, the current stock is read back so the caller can
/// report what is actually left. Inside the order transaction the row is
/// already locked, so that value is the one the decrement saw.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: Quantity,
) -> Result<StockDecrement, RepositoryError> {
    let remaining: Option<i32> = sqlx::query_scalar(
        r"
        UPDATE storefront.products
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        RETURNING stock
        ",
    )
    .bind(product_id)
    .bind(quantity.get())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        return Ok(StockDecrement::Applied { remaining });
    }

    let available: Option<i32> =
        sqlx::query_scalar("SELECT stock FROM storefront.products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(StockDecrement::Insufficient {
        available: available.unwrap_or(0),
    })
}
