//! Session-related types.
//!
//! Sign-in happens outside this service; whatever authenticates the user
//! stores a [`CurrentUser`] under [`session_keys::CURRENT_USER`].

use serde::{Deserialize, Serialize};

use atelier_core::{Email, UserId, UserRole};

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// User's role.
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether this user may see and manage every order.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
