//! The order transaction.
//!
//! One call to [`TransactionCoordinator::commit`] is one database
//! transaction. Within it:
//!
//! 1. lock every product row in the cart (ascending id order);
//! 2. check stock for each line in submission order, aborting on the
//!    first shortfall;
//! 3. conditionally decrement stock (`WHERE stock >= qty`), reporting the
//!    stock actually left if another writer got there first;
//! 4. insert the `PENDING` order header, its items, shipping and payment;
//! 5. commit.
//!
//! Any error returns before commit and the transaction handle is dropped,
//! which rolls back every write including earlier decrements.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use atelier_core::{OrderId, Price, ProductId};

use super::{CheckoutError, ResolvedIdentity};
use crate::db::{OrderStore, OrderTransaction, StockDecrement};
use crate::models::{NewOrder, NewOrderItem, OrderDraft, Product};

/// Runs order transactions against an [`OrderStore`].
pub struct TransactionCoordinator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: OrderStore + ?Sized> TransactionCoordinator<'a, S> {
    /// Create a coordinator over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Atomically reserve stock and persist the order aggregate.
    ///
    /// Item prices and the order total are taken from the locked product
    /// rows, so they reflect the catalogue at commit time.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` if any line cannot be fulfilled,
    /// `ProductNotFound` if a product disappeared after assembly, and
    /// `Transaction` for persistence failures. In every case nothing was
    /// written.
    pub async fn commit(
        &self,
        owner: ResolvedIdentity,
        draft: &OrderDraft,
    ) -> Result<OrderId, CheckoutError> {
        let mut tx = self.store.begin().await?;

        let ids: Vec<ProductId> = draft.lines.iter().map(|l| l.product_id).collect();
        let locked: HashMap<ProductId, Product> = tx
            .lock_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = locked
                .get(&line.product_id)
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            if product.stock < line.quantity.get() {
                return Err(insufficient(product, line.quantity.get()));
            }

            if product.price != line.unit_price {
                debug!(
                    product_id = %product.id,
                    assembled = %line.unit_price,
                    current = %product.price,
                    "Price changed since assembly; using current price"
                );
            }

            items.push(NewOrderItem {
                product_id: product.id,
                quantity: line.quantity,
                price: product.price,
            });
        }

        for item in &items {
            let requested = item.quantity.get();
            match tx.decrement_stock(item.product_id, item.quantity).await? {
                StockDecrement::Applied { remaining } => {
                    debug!(product_id = %item.product_id, remaining, "Stock decremented");
                }
                StockDecrement::Insufficient { available } => {
                    warn!(
                        product_id = %item.product_id,
                        available,
                        requested,
                        "Conditional stock decrement lost a race"
                    );
                    return Err(CheckoutError::InsufficientStock {
                        product_id: item.product_id,
                        available,
                        requested,
                    });
                }
            }
        }

        let total: Price = items.iter().map(|i| i.price.times(i.quantity)).sum();
        let order_id = tx
            .insert_order(&NewOrder {
                user_id: owner.user_id,
                total,
                is_guest: owner.is_guest,
            })
            .await?;
        tx.insert_items(order_id, &items).await?;
        tx.insert_shipping(order_id, &draft.shipping).await?;
        tx.insert_payment(order_id, &draft.payment).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            user_id = %owner.user_id,
            items = items.len(),
            total = %total,
            guest = owner.is_guest,
            "Order committed"
        );
        Ok(order_id)
    }
}

fn insufficient(product: &Product, requested: i32) -> CheckoutError {
    warn!(
        product_id = %product.id,
        available = product.stock,
        requested,
        "Insufficient stock"
    );
    CheckoutError::InsufficientStock {
        product_id: product.id,
        available: product.stock,
        requested,
    }
}
