//! In-memory store for tests.
//!
//! Transactions are serialisable: [`OrderStore::begin`] takes the store
//! lock and works on a private copy of the state, which replaces the live
//! state only on commit. Dropping a transaction discards the copy. Readers
//! take the same lock, so they never observe a transaction in progress.
//!
//! Faults can be injected at any step of the order transaction with
//! [`MemoryStore::fail_at`] to exercise the rollback paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use atelier_core::{Email, OrderId, OrderItemId, OrderStatus, Price, ProductId, Quantity, UserId, UserRole};

use super::RepositoryError;
use super::store::{
    CatalogStore, OrderReader, OrderStore, OrderTransaction, StockDecrement, StorefrontStore,
    UserStore,
};
use crate::models::{
    NewGuestUser, NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderOwner,
    PaymentDetails, Product, ShippingDetails, User,
};

/// Step of the order transaction at which an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    LockProducts,
    DecrementStock,
    InsertOrder,
    InsertItems,
    InsertShipping,
    InsertPayment,
    Commit,
}

#[derive(Debug, Clone)]
struct OrderRecord {
    user_id: UserId,
    status: OrderStatus,
    total: Price,
    is_guest: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ItemRecord {
    id: OrderItemId,
    order_id: OrderId,
    item: NewOrderItem,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderRecord>,
    items: Vec<ItemRecord>,
    shipping: HashMap<OrderId, ShippingDetails>,
    payments: HashMap<OrderId, PaymentDetails>,
    next_user: i32,
    next_product: i32,
    next_order: i32,
    next_item: i32,
}

impl MemoryState {
    fn next(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }

    fn materialise(&self, id: OrderId) -> Option<Order> {
        let record = self.orders.get(&id)?;
        let owner = self.users.get(&record.user_id)?;
        let items = self
            .items
            .iter()
            .filter(|i| i.order_id == id)
            .map(|i| OrderItem {
                id: i.id,
                product_id: i.item.product_id,
                product_name: self
                    .products
                    .get(&i.item.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                quantity: i.item.quantity,
                price: i.item.price,
            })
            .collect();

        Some(Order {
            id,
            user_id: record.user_id,
            status: record.status,
            total: record.total,
            is_guest: record.is_guest,
            created_at: record.created_at,
            updated_at: record.updated_at,
            owner: OrderOwner {
                id: owner.id,
                name: owner.name.clone(),
                email: owner.email.clone(),
            },
            items,
            shipping: self.shipping.get(&id)?.clone(),
            payment: self.payments.get(&id)?.clone(),
        })
    }
}

/// In-memory implementation of [`StorefrontStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Mutex<Vec<FaultPoint>>>,
    repricing: Arc<Mutex<Vec<(ProductId, Price)>>>,
    rival_sales: Arc<Mutex<Vec<(ProductId, i32)>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalogue product.
    pub async fn add_product(&self, name: &str, price: Price, stock: i32) -> ProductId {
        let mut state = self.state.lock().await;
        let id = ProductId::new(MemoryState::next(&mut state.next_product));
        state.products.insert(
            id,
            Product {
                id,
                name: name.to_owned(),
                price,
                stock,
            },
        );
        id
    }

    /// Add a registered user.
    pub async fn add_user(&self, email: &Email, name: &str, role: UserRole) -> UserId {
        let mut state = self.state.lock().await;
        let id = UserId::new(MemoryState::next(&mut state.next_user));
        let now = Utc::now();
        state.users.insert(
            id,
            User {
                id,
                email: email.clone(),
                name: name.to_owned(),
                role,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    /// Current committed stock of a product.
    pub async fn stock(&self, id: ProductId) -> Option<i32> {
        self.state.lock().await.products.get(&id).map(|p| p.stock)
    }

    /// Number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Number of committed order items, across all orders.
    pub async fn order_item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Number of committed shipping plus payment snapshots.
    pub async fn snapshot_count(&self) -> usize {
        let state = self.state.lock().await;
        state.shipping.len() + state.payments.len()
    }

    /// Number of user rows holding `email`.
    pub async fn users_with_email(&self, email: &Email) -> usize {
        self.state
            .lock()
            .await
            .users
            .values()
            .filter(|u| u.email == *email)
            .count()
    }

    /// Make the next transaction fail at `point` (one-shot).
    pub async fn fail_at(&self, point: FaultPoint) {
        self.faults.lock().await.push(point);
    }

    /// Change a product's price when the next transaction begins, as if the
    /// catalogue were edited between cart assembly and commit.
    pub async fn reprice_on_next_begin(&self, id: ProductId, price: Price) {
        self.repricing.lock().await.push((id, price));
    }

    /// Sell `quantity` units of a product to someone else just before the
    /// next conditional decrement of that product runs (one-shot).
    ///
    /// Models a writer that slipped past the row locks, so the decrement's
    /// `stock >= qty` guard is the only thing left to stop an oversell. The
    /// rival sale is durable even if the transaction rolls back.
    pub async fn sell_before_next_decrement(&self, id: ProductId, quantity: i32) {
        self.rival_sales.lock().await.push((id, quantity));
    }
}

async fn check_fault(
    faults: &Mutex<Vec<FaultPoint>>,
    point: FaultPoint,
) -> Result<(), RepositoryError> {
    let mut faults = faults.lock().await;
    if let Some(pos) = faults.iter().position(|f| *f == point) {
        faults.remove(pos);
        return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
            "injected fault at {point:?}"
        ))));
    }
    Ok(())
}

/// Open transaction over a private copy of the state.
pub struct MemoryTransaction {
    live: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    faults: Arc<Mutex<Vec<FaultPoint>>>,
    rival_sales: Arc<Mutex<Vec<(ProductId, i32)>>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == *email).cloned())
    }

    async fn create_guest_user(&self, guest: &NewGuestUser) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == guest.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = UserId::new(MemoryState::next(&mut state.next_user));
        let now = Utc::now();
        let user = User {
            id,
            email: guest.email.clone(),
            name: guest.name.clone(),
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, RepositoryError> {
        let mut live = Arc::clone(&self.state).lock_owned().await;
        for (id, price) in self.repricing.lock().await.drain(..) {
            if let Some(product) = live.products.get_mut(&id) {
                product.price = price;
            }
        }

        let work = live.clone();
        Ok(MemoryTransaction {
            live,
            work,
            faults: Arc::clone(&self.faults),
            rival_sales: Arc::clone(&self.rival_sales),
        })
    }
}

#[async_trait]
impl OrderTransaction for MemoryTransaction {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        check_fault(&self.faults, FaultPoint::LockProducts).await?;
        let mut products: Vec<Product> = ids
            .iter()
            .filter_map(|id| self.work.products.get(id).cloned())
            .collect();
        products.sort_by_key(|p| p.id);
        products.dedup_by_key(|p| p.id);
        Ok(products)
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockDecrement, RepositoryError> {
        check_fault(&self.faults, FaultPoint::DecrementStock).await?;

        let rival = {
            let mut sales = self.rival_sales.lock().await;
            sales
                .iter()
                .position(|(id, _)| *id == product_id)
                .map(|pos| sales.remove(pos).1)
        };
        if let Some(sold) = rival {
            for state in [&mut *self.live, &mut self.work] {
                if let Some(product) = state.products.get_mut(&product_id) {
                    product.stock = (product.stock - sold).max(0);
                }
            }
        }

        Ok(match self.work.products.get_mut(&product_id) {
            Some(product) if product.stock >= quantity.get() => {
                product.stock -= quantity.get();
                StockDecrement::Applied {
                    remaining: product.stock,
                }
            }
            Some(product) => StockDecrement::Insufficient {
                available: product.stock,
            },
            None => StockDecrement::Insufficient { available: 0 },
        })
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        check_fault(&self.faults, FaultPoint::InsertOrder).await?;
        if !self.work.users.contains_key(&order.user_id) {
            return Err(RepositoryError::Conflict(format!(
                "user {} does not exist",
                order.user_id
            )));
        }

        let id = OrderId::new(MemoryState::next(&mut self.work.next_order));
        let now = Utc::now();
        self.work.orders.insert(
            id,
            OrderRecord {
                user_id: order.user_id,
                status: OrderStatus::Pending,
                total: order.total,
                is_guest: order.is_guest,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn insert_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError> {
        check_fault(&self.faults, FaultPoint::InsertItems).await?;
        for item in items {
            let id = OrderItemId::new(MemoryState::next(&mut self.work.next_item));
            self.work.items.push(ItemRecord {
                id,
                order_id,
                item: *item,
            });
        }
        Ok(())
    }

    async fn insert_shipping(
        &mut self,
        order_id: OrderId,
        shipping: &ShippingDetails,
    ) -> Result<(), RepositoryError> {
        check_fault(&self.faults, FaultPoint::InsertShipping).await?;
        self.work.shipping.insert(order_id, shipping.clone());
        Ok(())
    }

    async fn insert_payment(
        &mut self,
        order_id: OrderId,
        payment: &PaymentDetails,
    ) -> Result<(), RepositoryError> {
        check_fault(&self.faults, FaultPoint::InsertPayment).await?;
        self.work.payments.insert(order_id, payment.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        check_fault(&self.faults, FaultPoint::Commit).await?;
        *self.live = self.work;
        Ok(())
    }
}

#[async_trait]
impl OrderReader for MemoryStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.lock().await.materialise(id))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .keys()
            .filter_map(|id| state.materialise(*id))
            .filter(|o| filter.includes(o))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        match state.orders.get_mut(&id) {
            Some(record) if record.status == from => {
                record.status = to;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl StorefrontStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
