//! Order placement.
//!
//! [`CheckoutService::place_order`] drives the whole flow:
//! assembler (validation and read-only pricing) → identity resolver →
//! transaction coordinator → materialised order. Validation runs first, so
//! a rejected cart never creates a guest account.

mod assembler;
mod coordinator;
mod error;
mod identity;
mod request;

pub use assembler::OrderAssembler;
pub use coordinator::TransactionCoordinator;
pub use error::{CheckoutError, IdentityError};
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use request::{CartItemInput, PaymentForm, PlaceOrderRequest, ShippingForm};

use crate::db::{RepositoryError, StorefrontStore};
use crate::models::{CurrentUser, Order};

/// Checkout service.
pub struct CheckoutService<'a, S> {
    store: &'a S,
}

impl<'a, S: StorefrontStore> CheckoutService<'a, S> {
    /// Create a checkout service over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Place an order for the signed-in user or, without a session, for
    /// the guest named in the shipping form.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. No order or stock change survives an error.
    pub async fn place_order(
        &self,
        session: Option<&CurrentUser>,
        request: &PlaceOrderRequest,
    ) -> Result<Order, CheckoutError> {
        let draft = OrderAssembler::new(self.store).assemble(request).await?;
        let owner = IdentityResolver::new(self.store)
            .resolve(session, &draft.shipping)
            .await?;
        let order_id = TransactionCoordinator::new(self.store)
            .commit(owner, &draft)
            .await?;

        self.store
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::Transaction(RepositoryError::NotFound))
    }
}
