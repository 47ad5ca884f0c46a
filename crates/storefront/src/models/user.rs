//! User domain types.

use chrono::{DateTime, Utc};

use atelier_core::{Email, UserId, UserRole};

/// A storefront user (domain type).
///
/// Guest checkouts create one of these with an unusable credential, so a
/// guest can later claim the account through password reset.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalised email address (unique).
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Access role.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a guest account during checkout.
#[derive(Debug, Clone)]
pub struct NewGuestUser {
    /// Shipping email, used as the account email.
    pub email: Email,
    /// `"{first} {last}"` from the shipping form.
    pub name: String,
    /// Argon2 hash of a random secret nobody knows.
    pub password_hash: String,
}
