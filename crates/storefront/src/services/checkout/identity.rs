//! Identity resolution: map a checkout to the user who will own the order.
//!
//! Resolution order:
//! 1. The signed-in session user, as-is.
//! 2. An existing account whose email matches the shipping email.
//! 3. A freshly created guest account with an unusable credential.
//!
//! Two guest checkouts racing on the same email both end up with the one
//! row that won the insert: the loser sees `Conflict` and re-reads.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use rand::{Rng, distr::Alphanumeric};
use tracing::{debug, info};

use atelier_core::UserId;

use super::IdentityError;
use crate::db::{RepositoryError, UserStore};
use crate::models::{CurrentUser, NewGuestUser, ShippingDetails};

/// Length of the random secret behind a guest credential.
const GUEST_SECRET_LENGTH: usize = 32;

/// The user an order will be written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: UserId,
    /// `true` when nobody was signed in.
    pub is_guest: bool,
}

/// Resolves checkouts to user ids.
pub struct IdentityResolver<'a, U: ?Sized> {
    users: &'a U,
}

impl<'a, U: UserStore + ?Sized> IdentityResolver<'a, U> {
    /// Create a resolver over `users`.
    #[must_use]
    pub const fn new(users: &'a U) -> Self {
        Self { users }
    }

    /// Resolve the owner of an order.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the account cannot be read or created.
    pub async fn resolve(
        &self,
        session: Option<&CurrentUser>,
        shipping: &ShippingDetails,
    ) -> Result<ResolvedIdentity, IdentityError> {
        if let Some(user) = session {
            return Ok(ResolvedIdentity {
                user_id: user.id,
                is_guest: false,
            });
        }

        let user_id = self.find_or_create_guest(shipping).await?;
        Ok(ResolvedIdentity {
            user_id,
            is_guest: true,
        })
    }

    async fn find_or_create_guest(
        &self,
        shipping: &ShippingDetails,
    ) -> Result<UserId, IdentityError> {
        if let Some(user) = self.users.find_user_by_email(&shipping.email).await? {
            debug!(user_id = %user.id, "Reusing account for guest checkout");
            return Ok(user.id);
        }

        let guest = NewGuestUser {
            email: shipping.email.clone(),
            name: shipping.full_name(),
            password_hash: unusable_password_hash()?,
        };

        match self.users.create_guest_user(&guest).await {
            Ok(user) => {
                info!(user_id = %user.id, "Created guest account");
                Ok(user.id)
            }
            Err(RepositoryError::Conflict(_)) => {
                let user = self
                    .users
                    .find_user_by_email(&shipping.email)
                    .await?
                    .ok_or_else(|| IdentityError::Vanished(shipping.email.to_string()))?;
                debug!(user_id = %user.id, "Guest insert lost a race; reusing winner");
                Ok(user.id)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Argon2id hash of a random secret that is immediately discarded.
fn unusable_password_hash() -> Result<String, IdentityError> {
    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GUEST_SECRET_LENGTH)
        .map(char::from)
        .collect();
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| IdentityError::CredentialHash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use atelier_core::{Email, UserRole};

    use super::*;
    use crate::models::User;

    fn user(id: i32, email: &Email) -> User {
        User {
            id: UserId::new(id),
            email: email.clone(),
            name: "Ada Lovelace".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            address: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            postal_code: "N1 9GU".to_string(),
        }
    }

    /// Store where another request always wins the insert.
    #[derive(Default)]
    struct RacingUsers {
        lookups: AtomicUsize,
        created: Mutex<Vec<NewGuestUser>>,
    }

    #[async_trait]
    impl UserStore for RacingUsers {
        async fn find_user_by_email(
            &self,
            email: &Email,
        ) -> Result<Option<User>, RepositoryError> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((n > 0).then(|| user(42, email)))
        }

        async fn create_guest_user(&self, guest: &NewGuestUser) -> Result<User, RepositoryError> {
            self.created.lock().unwrap().push(guest.clone());
            Err(RepositoryError::Conflict("email already exists".to_string()))
        }
    }

    /// Store that never has a matching user and accepts inserts.
    #[derive(Default)]
    struct EmptyUsers {
        created: Mutex<Vec<NewGuestUser>>,
    }

    #[async_trait]
    impl UserStore for EmptyUsers {
        async fn find_user_by_email(&self, _: &Email) -> Result<Option<User>, RepositoryError> {
            Ok(None)
        }

        async fn create_guest_user(&self, guest: &NewGuestUser) -> Result<User, RepositoryError> {
            self.created.lock().unwrap().push(guest.clone());
            Ok(user(7, &guest.email))
        }
    }

    struct BrokenUsers;

    #[async_trait]
    impl UserStore for BrokenUsers {
        async fn find_user_by_email(&self, _: &Email) -> Result<Option<User>, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn create_guest_user(&self, _: &NewGuestUser) -> Result<User, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn test_session_user_returned_without_lookup() {
        let session = CurrentUser {
            id: UserId::new(3),
            email: Email::parse("someone@example.com").unwrap(),
            role: UserRole::User,
        };

        let identity = IdentityResolver::new(&BrokenUsers)
            .resolve(Some(&session), &shipping())
            .await
            .unwrap();

        assert_eq!(identity.user_id, UserId::new(3));
        assert!(!identity.is_guest);
    }

    #[tokio::test]
    async fn test_guest_created_with_shipping_name() {
        let users = EmptyUsers::default();
        let identity = IdentityResolver::new(&users)
            .resolve(None, &shipping())
            .await
            .unwrap();

        assert_eq!(identity.user_id, UserId::new(7));
        assert!(identity.is_guest);

        let created = users.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "Ada Lovelace");
        assert!(created[0].password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_conflict_falls_back_to_existing_row() {
        let users = RacingUsers::default();
        let identity = IdentityResolver::new(&users)
            .resolve(None, &shipping())
            .await
            .unwrap();

        assert_eq!(identity.user_id, UserId::new(42));
        assert_eq!(users.created.lock().unwrap().len(), 1);
        assert_eq!(users.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces() {
        let err = IdentityResolver::new(&BrokenUsers)
            .resolve(None, &shipping())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Repository(_)));
    }

    #[test]
    fn test_guest_hashes_differ() {
        let a = unusable_password_hash().unwrap();
        let b = unusable_password_hash().unwrap();
        assert_ne!(a, b);
    }
}
