//! Checkout error types.

use thiserror::Error;

use atelier_core::ProductId;

use crate::db::RepositoryError;

/// Errors that can occur while turning a cart into an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No items were submitted.
    #[error("cart is empty")]
    EmptyCart,

    /// A shipping field is missing or malformed.
    #[error("invalid shipping info: {field} {reason}")]
    InvalidShippingInfo {
        /// Wire name of the offending field.
        field: &'static str,
        reason: String,
    },

    /// A payment field is missing or malformed.
    #[error("invalid payment info: {field} {reason}")]
    InvalidPaymentInfo {
        /// Wire name of the offending field.
        field: &'static str,
        reason: String,
    },

    /// A line quantity is not a positive integer, or lines for the same
    /// product add up to more than can be stored.
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: i64,
    },

    /// The cart names a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Not enough stock at commit time. Safe to retry with a smaller cart.
    #[error(
        "insufficient stock for product {product_id}: {available} available, {requested} requested"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// The customer account could not be found or created.
    #[error("could not resolve customer identity: {0}")]
    IdentityResolutionFailed(#[source] IdentityError),

    /// Persistence failed; nothing was written.
    #[error("order transaction failed: {0}")]
    Transaction(#[from] RepositoryError),
}

impl CheckoutError {
    /// Whether the caller supplied bad input (rejected before any write).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyCart
                | Self::InvalidShippingInfo { .. }
                | Self::InvalidPaymentInfo { .. }
                | Self::InvalidQuantity { .. }
                | Self::ProductNotFound(_)
        )
    }

    /// Whether the same request may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }

    pub(crate) fn shipping(field: &'static str, reason: impl ToString) -> Self {
        Self::InvalidShippingInfo {
            field,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn payment(field: &'static str, reason: impl ToString) -> Self {
        Self::InvalidPaymentInfo {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Why a customer identity could not be resolved.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Lookup or insert failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The guest credential could not be hashed.
    #[error("guest credential hashing failed")]
    CredentialHash,

    /// A concurrent insert reported the email as taken but the row could not
    /// be read back.
    #[error("guest account for {0} vanished after a conflicting insert")]
    Vanished(String),
}

impl From<IdentityError> for CheckoutError {
    fn from(err: IdentityError) -> Self {
        Self::IdentityResolutionFailed(err)
    }
}
