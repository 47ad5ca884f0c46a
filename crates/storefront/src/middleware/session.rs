//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! cookie is signed with the key loaded from `STOREFRONT_SESSION_SECRET`.

use sqlx::PgPool;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "atelier_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the storefront
/// migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    session_layer(PostgresStore::new(pool.clone()), config)
}

/// Session layer over any store, with the storefront's cookie settings.
#[must_use]
pub fn session_layer<S: SessionStore>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(config.session_key.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::header, routing::get};
    use secrecy::SecretString;
    use tower::ServiceExt;
    use tower_sessions::cookie::{Cookie, CookieJar, Key};
    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::config::DatabaseConfig;

    fn config(key: Key) -> StorefrontConfig {
        StorefrontConfig {
            database: DatabaseConfig {
                url: SecretString::from("postgres://localhost/atelier"),
                max_connections: 1,
                min_connections: 0,
                acquire_timeout_secs: 1,
            },
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://localhost".to_string(),
            session_key: key,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    async fn issued_cookie(key: Key) -> Cookie<'static> {
        let app = Router::new()
            .route(
                "/",
                get(|session: Session| async move {
                    session.insert("seen", true).await.unwrap();
                }),
            )
            .layer(session_layer(MemoryStore::default(), &config(key)));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        Cookie::parse(set_cookie).unwrap()
    }

    #[tokio::test]
    async fn test_session_cookie_is_signed_with_configured_key() {
        let key = Key::generate();
        let cookie = issued_cookie(key.clone()).await;
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);

        let mut jar = CookieJar::new();
        jar.add_original(cookie.clone());
        assert!(jar.signed(&key).get(SESSION_COOKIE_NAME).is_some());

        let mut other = CookieJar::new();
        other.add_original(cookie);
        assert!(other.signed(&Key::generate()).get(SESSION_COOKIE_NAME).is_none());
    }
}
