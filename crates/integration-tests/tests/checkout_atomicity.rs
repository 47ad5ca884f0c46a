//! Rollback guarantees of the order transaction.
//!
//! Every step of the transaction is made to fail in turn; afterwards the
//! store must look exactly as it did before the attempt.

#![allow(clippy::unwrap_used)]

use atelier_core::Email;
use atelier_integration_tests::{Fixture, order_request};
use atelier_storefront::db::FaultPoint;
use atelier_storefront::services::{CheckoutError, CheckoutService};

const ALL_POINTS: [FaultPoint; 7] = [
    FaultPoint::LockProducts,
    FaultPoint::DecrementStock,
    FaultPoint::InsertOrder,
    FaultPoint::InsertItems,
    FaultPoint::InsertShipping,
    FaultPoint::InsertPayment,
    FaultPoint::Commit,
];

#[tokio::test]
async fn test_fault_at_any_step_leaves_no_trace() {
    for point in ALL_POINTS {
        let fx = Fixture::new().await;
        let request = order_request(&[(fx.scarf, 2), (fx.tote, 1)], "guest@example.com");
        fx.store.fail_at(point).await;

        let err = CheckoutService::new(&fx.store)
            .place_order(None, &request)
            .await
            .unwrap_err();

        assert!(
            matches!(err, CheckoutError::Transaction(_)),
            "{point:?}: unexpected {err:?}"
        );
        assert!(!err.is_validation(), "{point:?}");
        assert_eq!(fx.store.stock(fx.scarf).await, Some(5), "{point:?}");
        assert_eq!(fx.store.stock(fx.tote).await, Some(3), "{point:?}");
        assert_eq!(fx.store.order_count().await, 0, "{point:?}");
        assert_eq!(fx.store.order_item_count().await, 0, "{point:?}");
        assert_eq!(fx.store.snapshot_count().await, 0, "{point:?}");
    }
}

#[tokio::test]
async fn test_retry_after_fault_succeeds() {
    let fx = Fixture::new().await;
    let request = order_request(&[(fx.scarf, 2)], "guest@example.com");
    let checkout = CheckoutService::new(&fx.store);

    fx.store.fail_at(FaultPoint::InsertShipping).await;
    assert!(checkout.place_order(None, &request).await.is_err());

    let order = checkout.place_order(None, &request).await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(fx.store.stock(fx.scarf).await, Some(3));
    assert_eq!(fx.store.order_count().await, 1);
    assert_eq!(fx.store.snapshot_count().await, 2);
}

#[tokio::test]
async fn test_guest_account_survives_failed_transaction() {
    // The guest account is created before the transaction and is reused by
    // the retry rather than duplicated.
    let fx = Fixture::new().await;
    let email = Email::parse("guest@example.com").unwrap();
    let request = order_request(&[(fx.ring, 1)], email.as_str());
    let checkout = CheckoutService::new(&fx.store);

    fx.store.fail_at(FaultPoint::Commit).await;
    assert!(checkout.place_order(None, &request).await.is_err());
    assert_eq!(fx.store.users_with_email(&email).await, 1);

    let order = checkout.place_order(None, &request).await.unwrap();
    assert!(order.is_guest);
    assert_eq!(fx.store.users_with_email(&email).await, 1);
}

#[tokio::test]
async fn test_shortfall_on_later_line_rolls_back_earlier_lines() {
    let fx = Fixture::new().await;
    let request = order_request(
        &[(fx.scarf, 1), (fx.tote, 1), (fx.ring, 2)],
        "guest@example.com",
    );

    let err = CheckoutService::new(&fx.store)
        .place_order(None, &request)
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            product_id,
            available,
            requested,
        } => {
            assert_eq!(product_id, fx.ring);
            assert_eq!(available, 1);
            assert_eq!(requested, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(fx.store.stock(fx.scarf).await, Some(5));
    assert_eq!(fx.store.stock(fx.tote).await, Some(3));
    assert_eq!(fx.store.stock(fx.ring).await, Some(1));
    assert_eq!(fx.store.order_count().await, 0);
}
