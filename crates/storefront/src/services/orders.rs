//! Order read path and admin status changes.
//!
//! Access rules:
//! - admins see every order;
//! - signed-in customers see only their own orders;
//! - anonymous callers may read a single order by id if they supply the
//!   shipping email it was placed with.

use thiserror::Error;
use tracing::info;

use atelier_core::{OrderId, OrderStatus, StatusTransitionError};

use crate::db::{OrderReader, RepositoryError};
use crate::models::{CurrentUser, Order, OrderFilter};

/// Errors from the order read path.
#[derive(Debug, Error)]
pub enum OrderQueryError {
    /// No such order, or a guest email that does not match.
    #[error("order not found")]
    NotFound,

    /// The caller must sign in.
    #[error("authentication required")]
    Unauthorized,

    /// The caller is signed in but may not see or change this order.
    #[error("not allowed to access this order")]
    Forbidden,

    /// The requested status change is not allowed.
    #[error(transparent)]
    InvalidTransition(#[from] StatusTransitionError),

    /// Another update changed the status first.
    #[error("order status changed concurrently")]
    ConcurrentUpdate,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Who is asking.
#[derive(Debug, Clone)]
pub enum Requester {
    /// A signed-in user (customer or admin).
    User(CurrentUser),
    /// Nobody is signed in; `email` is the claimed shipping email, if any.
    Guest { email: Option<String> },
}

impl Requester {
    /// Build a requester from the optional session user and guest email.
    #[must_use]
    pub fn new(session: Option<CurrentUser>, email: Option<String>) -> Self {
        session.map_or(Self::Guest { email }, Self::User)
    }

    fn admin(&self) -> Option<&CurrentUser> {
        match self {
            Self::User(user) if user.is_admin() => Some(user),
            _ => None,
        }
    }
}

/// Order query service.
pub struct OrderQueryService<'a, R: ?Sized> {
    orders: &'a R,
}

impl<'a, R: OrderReader + ?Sized> OrderQueryService<'a, R> {
    /// Create a query service over `orders`.
    #[must_use]
    pub const fn new(orders: &'a R) -> Self {
        Self { orders }
    }

    /// Fetch one order the requester may see.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized` (anonymous without an email) or
    /// `Forbidden` (another customer's order).
    pub async fn get(&self, id: OrderId, requester: &Requester) -> Result<Order, OrderQueryError> {
        if let Requester::Guest { email: None } = requester {
            return Err(OrderQueryError::Unauthorized);
        }

        let order = self
            .orders
            .get_order(id)
            .await?
            .ok_or(OrderQueryError::NotFound)?;

        match requester {
            Requester::User(user) if user.is_admin() || order.user_id == user.id => Ok(order),
            Requester::User(_) => Err(OrderQueryError::Forbidden),
            Requester::Guest { email: Some(email) } if order.shipping.email.matches(email) => {
                Ok(order)
            }
            Requester::Guest { .. } => Err(OrderQueryError::NotFound),
        }
    }

    /// List the orders the requester may see, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for anonymous callers.
    pub async fn list(&self, requester: &Requester) -> Result<Vec<Order>, OrderQueryError> {
        let filter = match requester {
            Requester::User(user) if user.is_admin() => OrderFilter::All,
            Requester::User(user) => OrderFilter::OwnedBy(user.id),
            Requester::Guest { .. } => return Err(OrderQueryError::Unauthorized),
        };
        Ok(self.orders.list_orders(filter).await?)
    }

    /// Move an order to `status` (admin only).
    ///
    /// Setting the current status again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized`/`Forbidden` for non-admins, `NotFound`,
    /// `InvalidTransition` for disallowed moves and `ConcurrentUpdate` if
    /// the status changed between read and write.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        requester: &Requester,
    ) -> Result<Order, OrderQueryError> {
        let admin = match requester {
            Requester::Guest { .. } => return Err(OrderQueryError::Unauthorized),
            Requester::User(_) => requester.admin().ok_or(OrderQueryError::Forbidden)?,
        };

        let order = self
            .orders
            .get_order(id)
            .await?
            .ok_or(OrderQueryError::NotFound)?;
        let current = order.status;
        current.transition_to(status)?;
        if current == status {
            return Ok(order);
        }

        if !self.orders.update_order_status(id, current, status).await? {
            return Err(OrderQueryError::ConcurrentUpdate);
        }
        info!(order_id = %id, from = %current, to = %status, admin_id = %admin.id, "Order status updated");

        self.orders
            .get_order(id)
            .await?
            .ok_or(OrderQueryError::NotFound)
    }
}
