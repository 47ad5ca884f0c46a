//! HTTP surface of the order API, driven in process with `oneshot`.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use atelier_core::{ProductId, UserRole};
use atelier_integration_tests::{Fixture, app, order_json};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn place(fx: &Fixture, items: &[(ProductId, i64)], email: &str) -> Value {
    let (status, body) = send(
        app(fx.store.clone(), None),
        json_request(Method::POST, "/api/orders", &order_json(items, email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let fx = Fixture::new().await;

    let (status, body) = send(app(fx.store.clone(), None), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = send(app(fx.store.clone(), None), get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// POST /api/orders
// =============================================================================

#[tokio::test]
async fn test_place_order_returns_created_order() {
    let fx = Fixture::new().await;

    let body = place(&fx, &[(fx.scarf, 2), (fx.ring, 1)], "guest@example.com").await;

    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["isGuest"], true);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["payment"]["maskedCardNumber"], "****4242");
    assert_eq!(body["shipping"]["email"], "guest@example.com");
    assert!(!body.to_string().contains("4242424242424242"));
    assert_eq!(fx.store.stock(fx.scarf).await, Some(3));
    assert_eq!(fx.store.stock(fx.ring).await, Some(0));
}

#[tokio::test]
async fn test_place_order_insufficient_stock_is_conflict() {
    let fx = Fixture::new().await;

    let (status, body) = send(
        app(fx.store.clone(), None),
        json_request(
            Method::POST,
            "/api/orders",
            &order_json(&[(fx.scarf, 1), (fx.tote, 4)], "guest@example.com"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["productId"], fx.tote.as_i32());
    assert_eq!(body["available"], 3);
    assert_eq!(body["requested"], 4);
    assert_eq!(body["retryable"], true);
    assert_eq!(fx.store.stock(fx.scarf).await, Some(5));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_place_order_validation_errors() {
    let fx = Fixture::new().await;

    let mut empty = order_json(&[(fx.scarf, 1)], "guest@example.com");
    empty["items"] = json!([]);

    let mut bad_email = order_json(&[(fx.scarf, 1)], "guest@example.com");
    bad_email["shippingInfo"]["email"] = json!("not-an-email");

    let mut bad_card = order_json(&[(fx.scarf, 1)], "guest@example.com");
    bad_card["paymentInfo"]["cardNumber"] = json!("4242");

    let negative = order_json(&[(fx.scarf, -1)], "guest@example.com");

    for (body, code, field) in [
        (empty, "empty_cart", None),
        (bad_email, "invalid_shipping_info", Some("email")),
        (bad_card, "invalid_payment_info", Some("cardNumber")),
        (negative, "invalid_quantity", None),
    ] {
        let (status, response) = send(
            app(fx.store.clone(), None),
            json_request(Method::POST, "/api/orders", &body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{response}");
        assert_eq!(response["error"], code);
        if let Some(field) = field {
            assert_eq!(response["field"], field);
        }
    }

    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_place_order_unknown_product_is_not_found() {
    let fx = Fixture::new().await;

    let (status, body) = send(
        app(fx.store.clone(), None),
        json_request(
            Method::POST,
            "/api/orders",
            &order_json(&[(ProductId::new(404), 1)], "guest@example.com"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "product_not_found");
    assert_eq!(body["productId"], 404);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let fx = Fixture::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"items\": 12"))
        .unwrap();

    let (status, body) = send(app(fx.store.clone(), None), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_non_numeric_order_id_is_json_bad_request() {
    let fx = Fixture::new().await;

    let (status, body) = send(
        app(fx.store.clone(), None),
        get("/api/orders/abc?email=guest@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].is_string());

    let admin = fx.sign_up("admin@example.com", UserRole::Admin).await;
    let (status, body) = send(
        app(fx.store.clone(), Some(admin)),
        json_request(
            Method::PATCH,
            "/api/orders/abc",
            &json!({ "status": "PROCESSING" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_signed_in_order_is_not_guest() {
    let fx = Fixture::new().await;
    let user = fx.sign_up("client@example.com", UserRole::User).await;

    let (status, body) = send(
        app(fx.store.clone(), Some(user.clone())),
        json_request(
            Method::POST,
            "/api/orders",
            &order_json(&[(fx.tote, 1)], "client@example.com"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isGuest"], false);
    assert_eq!(body["userId"], user.id.as_i32());
}

// =============================================================================
// GET /api/orders and /api/orders/{id}
// =============================================================================

#[tokio::test]
async fn test_list_requires_session() {
    let fx = Fixture::new().await;

    let (status, _) = send(app(fx.store.clone(), None), get("/api/orders")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_returns_own_orders_only() {
    let fx = Fixture::new().await;
    let user = fx.sign_up("client@example.com", UserRole::User).await;
    place(&fx, &[(fx.scarf, 1)], "client@example.com").await;
    place(&fx, &[(fx.scarf, 1)], "someone.else@example.com").await;

    let (status, body) = send(app(fx.store.clone(), Some(user.clone())), get("/api/orders")).await;

    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["userId"], user.id.as_i32());

    let admin = fx.sign_up("admin@example.com", UserRole::Admin).await;
    let (_, body) = send(app(fx.store.clone(), Some(admin)), get("/api/orders")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_guest_lookup_needs_matching_email() {
    let fx = Fixture::new().await;
    let order = place(&fx, &[(fx.scarf, 1)], "guest@example.com").await;
    let id = order["id"].as_i64().unwrap();

    let (status, _) = send(app(fx.store.clone(), None), get(&format!("/api/orders/{id}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        app(fx.store.clone(), None),
        get(&format!("/api/orders/{id}?email=intruder@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(
        app(fx.store.clone(), None),
        get(&format!("/api/orders/{id}?email=Guest@Example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn test_other_users_order_is_forbidden() {
    let fx = Fixture::new().await;
    let order = place(&fx, &[(fx.scarf, 1)], "guest@example.com").await;
    let id = order["id"].as_i64().unwrap();
    let stranger = fx.sign_up("stranger@example.com", UserRole::User).await;

    let (status, body) = send(
        app(fx.store.clone(), Some(stranger)),
        get(&format!("/api/orders/{id}")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

// =============================================================================
// PATCH /api/orders/{id}
// =============================================================================

#[tokio::test]
async fn test_admin_advances_status() {
    let fx = Fixture::new().await;
    let order = place(&fx, &[(fx.scarf, 1)], "guest@example.com").await;
    let uri = format!("/api/orders/{}", order["id"]);
    let admin = fx.sign_up("admin@example.com", UserRole::Admin).await;

    let (status, body) = send(
        app(fx.store.clone(), Some(admin.clone())),
        json_request(Method::PATCH, &uri, &json!({ "status": "PROCESSING" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "PROCESSING");

    let (status, body) = send(
        app(fx.store.clone(), Some(admin)),
        json_request(Method::PATCH, &uri, &json!({ "status": "PENDING" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn test_customer_cannot_change_status() {
    let fx = Fixture::new().await;
    let user = fx.sign_up("guest@example.com", UserRole::User).await;
    let order = place(&fx, &[(fx.scarf, 1)], "guest@example.com").await;
    let uri = format!("/api/orders/{}", order["id"]);

    let (status, _) = send(
        app(fx.store.clone(), Some(user)),
        json_request(Method::PATCH, &uri, &json!({ "status": "CANCELLED" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
