//! Integration tests for Atelier.
//!
//! # Running Tests
//!
//! ```bash
//! # Checkout and HTTP tests (in-memory store, no services needed)
//! cargo test -p atelier-integration-tests
//!
//! # PostgreSQL tests (needs a migrated database)
//! TEST_DATABASE_URL=postgres://... cargo test -p atelier-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_*` - Order placement against the in-memory store
//! - `orders_api` - HTTP surface driven with `tower::ServiceExt::oneshot`
//! - `postgres_checkout` - The same guarantees against a real database

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use axum::{Router, extract::Request, middleware::Next};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower_sessions::Session;
use tower_sessions::cookie::Key;

use atelier_core::{Email, Price, ProductId, UserId, UserRole};
use atelier_storefront::config::{DatabaseConfig, StorefrontConfig};
use atelier_storefront::db::MemoryStore;
use atelier_storefront::middleware::{session_layer, set_current_user};
use atelier_storefront::models::CurrentUser;
use atelier_storefront::routes;
use atelier_storefront::services::checkout::{
    CartItemInput, PaymentForm, PlaceOrderRequest, ShippingForm,
};
use atelier_storefront::state::AppState;

/// Card used by the fixtures; only `****4242` may ever be stored.
pub const TEST_CARD: &str = "4242 4242 4242 4242";

/// Configuration that never touches the environment.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database: DatabaseConfig {
            url: SecretString::from("postgres://localhost/atelier_test"),
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 5,
        },
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost".to_string(),
        session_key: Key::generate(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Store seeded with a small catalogue.
pub struct Fixture {
    pub store: MemoryStore,
    /// 50.00, stock 5
    pub scarf: ProductId,
    /// 1250.00, stock 3
    pub tote: ProductId,
    /// 3400.00, stock 1
    pub ring: ProductId,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let scarf = store
            .add_product("Silk Scarf", Price::from_cents(5_000).expect("price"), 5)
            .await;
        let tote = store
            .add_product("Calfskin Tote", Price::from_cents(125_000).expect("price"), 3)
            .await;
        let ring = store
            .add_product("Gold Signet Ring", Price::from_cents(340_000).expect("price"), 1)
            .await;
        Self {
            store,
            scarf,
            tote,
            ring,
        }
    }

    /// Add a registered user and return the matching session identity.
    pub async fn sign_up(&self, email: &str, role: UserRole) -> CurrentUser {
        let email = Email::parse(email).expect("valid email");
        let id: UserId = self.store.add_user(&email, "Registered User", role).await;
        CurrentUser { id, email, role }
    }
}

/// A valid request for `items`, shipping to `email`.
#[must_use]
pub fn order_request(items: &[(ProductId, i64)], email: &str) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: items
            .iter()
            .map(|&(product_id, quantity)| CartItemInput {
                product_id,
                quantity,
            })
            .collect(),
        shipping_info: ShippingForm {
            first_name: "Coco".to_string(),
            last_name: "Chanel".to_string(),
            email: email.to_string(),
            address: "31 Rue Cambon".to_string(),
            city: "Paris".to_string(),
            postal_code: "75001".to_string(),
        },
        payment_info: PaymentForm {
            card_number: TEST_CARD.to_string(),
            expiry_date: "12/29".to_string(),
        },
    }
}

/// JSON body equivalent of [`order_request`].
#[must_use]
pub fn order_json(items: &[(ProductId, i64)], email: &str) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(id, qty)| json!({ "productId": id, "quantity": qty }))
        .collect();
    json!({
        "items": items,
        "shippingInfo": {
            "firstName": "Coco",
            "lastName": "Chanel",
            "email": email,
            "address": "31 Rue Cambon",
            "city": "Paris",
            "postalCode": "75001"
        },
        "paymentInfo": { "cardNumber": TEST_CARD, "expiryDate": "12/29" }
    })
}

/// The storefront router over `store`, optionally with `user` signed in.
pub fn app(store: MemoryStore, user: Option<CurrentUser>) -> Router {
    let router = routes::routes().with_state(AppState::new(store));

    let router = match user {
        Some(user) => router.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| {
                let user = user.clone();
                async move {
                    if let Some(session) = request.extensions().get::<Session>().cloned() {
                        set_current_user(&session, &user)
                            .await
                            .expect("session insert");
                    }
                    next.run(request).await
                }
            },
        )),
        None => router,
    };

    router.layer(session_layer(
        tower_sessions::MemoryStore::default(),
        &test_config(),
    ))
}
