mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{decimal, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, Set};
use serde_json::json;
use shopfront_api::{
    entities::{
        order::OrderStatus,
        payment::{self, PaymentStatus},
    },
    errors::{is_unique_violation, ServiceError},
    payments::SessionStatus,
    repositories::PaymentRepository,
    services::checkout::CheckoutOutcome,
};
use uuid::Uuid;

async fn buyer_with_cart(app: &TestApp) -> (Uuid, String) {
    let (seller_id, _) = app.seller("seller@example.com").await;
    let (user_id, token) = app.signup("buyer@example.com").await;
    let category = app.category("Audio").await;
    let speaker = app.product(seller_id, category.id, "Speaker", dec!(12.50)).await;
    app.add_to_cart(&token, speaker.id, 2).await;
    (user_id, token)
}

#[tokio::test]
async fn repeated_checkout_resumes_the_open_session() {
    let app = TestApp::new().await;
    let (user_id, token) = buyer_with_cart(&app).await;

    let (status, first) = app.call(Method::GET, "/payment", None, Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(decimal(&first["data"]["amount"]), dec!(25.00));
    let url = first["data"]["checkout_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("https://checkout.test/cs_test_"));

    let (status, second) = app.call(Method::GET, "/payment", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["checkout_url"], url.as_str());
    assert_eq!(second["data"]["payment_id"], first["data"]["payment_id"]);

    assert_eq!(app.gateway.sessions_created(), 1);
    let history = PaymentRepository::list_for_user(&*app.state.db, user_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn empty_cart_checkout_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.signup("empty@example.com").await;

    let (status, _) = app.call(Method::GET, "/payment", None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.gateway.sessions_created(), 0);
}

#[tokio::test]
async fn provider_failure_frees_the_user_to_retry() {
    let app = TestApp::new().await;
    let (user_id, token) = buyer_with_cart(&app).await;

    app.gateway.fail_next_sessions(true);
    let (status, _) = app.call(Method::GET, "/payment", None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(PaymentRepository::find_active(&*app.state.db, user_id)
        .await
        .unwrap()
        .is_none());

    app.gateway.fail_next_sessions(false);
    let (status, _) = app.call(Method::GET, "/payment", None, Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED);

    let history = PaymentRepository::list_for_user(&*app.state.db, user_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history
            .iter()
            .filter(|p| p.status == PaymentStatus::Failed)
            .count(),
        1
    );
}

#[tokio::test]
async fn paid_session_becomes_a_paid_order() {
    let app = TestApp::new().await;
    let (user_id, token) = buyer_with_cart(&app).await;
    let services = &app.state.services;

    let payment = services
        .checkout
        .initiate_checkout(user_id)
        .await
        .unwrap()
        .into_payment();

    app.gateway.settle_as(SessionStatus::Paid);
    let (status, body) = app
        .call(Method::GET, "/payment/verify", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "payment confirmed");
    assert_eq!(body["data"]["payment"]["status"], "success");

    let orders = services.orders.get_orders(user_id).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0].order;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.order_ref, payment.order_ref);
    assert_eq!(order.payment_id, Some(payment.id));
    assert_eq!(order.transaction_id, payment.session_id);
    assert_eq!(order.total_amount, dec!(25.00));

    assert!(services.cart.get_cart(user_id).await.unwrap().is_empty());
    assert_matches!(
        services.checkout.confirm_payment(user_id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn open_and_expired_sessions_update_the_payment() {
    let app = TestApp::new().await;
    let (user_id, _) = buyer_with_cart(&app).await;
    let checkout = &app.state.services.checkout;
    checkout.initiate_checkout(user_id).await.unwrap();

    app.gateway.settle_as(SessionStatus::Open);
    let confirmation = checkout.confirm_payment(user_id).await.unwrap();
    assert_eq!(confirmation.payment.status, PaymentStatus::Pending);
    assert!(confirmation.order.is_none());

    // Still active, so a new checkout resumes it.
    assert!(!checkout.initiate_checkout(user_id).await.unwrap().is_created());

    app.gateway.settle_as(SessionStatus::Expired);
    let confirmation = checkout.confirm_payment(user_id).await.unwrap();
    assert_eq!(confirmation.payment.status, PaymentStatus::Failed);
    assert_eq!(confirmation.payment.response.as_deref(), Some("expired"));

    assert!(app.state.services.orders.get_orders(user_id).await.unwrap().is_empty());
    assert_eq!(app.state.services.cart.get_cart(user_id).await.unwrap().items.len(), 1);

    assert!(checkout.initiate_checkout(user_id).await.unwrap().is_created());
    assert_eq!(app.gateway.sessions_created(), 2);
}

#[tokio::test]
async fn store_refuses_a_second_active_payment() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();

    let reservation = |order_ref: &str, status: PaymentStatus| {
        let now = Utc::now();
        payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            amount: Set(dec!(10.00)),
            order_ref: Set(order_ref.to_string()),
            session_id: Set(None),
            customer_id: Set(None),
            status: Set(status),
            checkout_url: Set(None),
            response: Set(None),
            line_items: Set(json!([])),
            created_at: Set(now),
            updated_at: Set(now),
        }
    };

    let db = &*app.state.db;
    PaymentRepository::insert(db, reservation("10000001", PaymentStatus::Failed))
        .await
        .unwrap();
    PaymentRepository::insert(db, reservation("10000002", PaymentStatus::Initial))
        .await
        .unwrap();

    let err = PaymentRepository::insert(db, reservation("10000003", PaymentStatus::Pending))
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));

    let err = PaymentRepository::insert(db, reservation("10000001", PaymentStatus::Success))
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));
}

#[tokio::test]
async fn paid_order_matches_the_charged_amount_after_cart_changes() {
    let app = TestApp::new().await;
    let (user_id, token) = buyer_with_cart(&app).await;
    let services = &app.state.services;

    let payment = services
        .checkout
        .initiate_checkout(user_id)
        .await
        .unwrap()
        .into_payment();
    assert_eq!(payment.amount, dec!(25.00));
    let charged = payment.lines().unwrap();
    assert_eq!(charged.len(), 1);
    assert_eq!(charged[0].quantity, 2);

    // Added while the provider page is open; not part of this charge.
    let (seller_id, _) = app.seller("late-seller@example.com").await;
    let category = app.category("Cables").await;
    let cable = app.product(seller_id, category.id, "Cable", dec!(2.50)).await;
    app.add_to_cart(&token, cable.id, 4).await;

    app.gateway.settle_as(SessionStatus::Paid);
    let confirmation = services.checkout.confirm_payment(user_id).await.unwrap();
    let order = confirmation.order.expect("paid session yields an order");

    assert_eq!(order.order.total_amount, payment.amount);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    let item_sum: Decimal = order.items.iter().map(|i| i.line_total()).sum();
    assert_eq!(item_sum, confirmation.payment.amount);

    let cart = services.cart.get_cart(user_id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, cable.id);
    assert_eq!(cart.total, dec!(10.00));
}

#[tokio::test]
async fn direct_order_is_refused_while_checkout_is_active() {
    let app = TestApp::new().await;
    let (user_id, token) = buyer_with_cart(&app).await;
    let services = &app.state.services;
    services.checkout.initiate_checkout(user_id).await.unwrap();

    let (status, body) = app
        .call(Method::POST, "/users/order", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_matches!(
        services.orders.create_order(user_id).await,
        Err(ServiceError::Conflict(msg)) if msg == "a checkout is in progress for this cart"
    );
    assert!(services.orders.get_orders(user_id).await.unwrap().is_empty());
    assert_eq!(services.cart.get_cart(user_id).await.unwrap().items.len(), 1);

    app.gateway.settle_as(SessionStatus::Paid);
    let confirmation = services.checkout.confirm_payment(user_id).await.unwrap();
    assert_eq!(confirmation.payment.status, PaymentStatus::Success);
    let orders = services.orders.get_orders(user_id).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order.status, OrderStatus::Paid);
    assert!(services.cart.get_cart(user_id).await.unwrap().is_empty());
}

/// Reservation row with no provider session, as left by a crash between
/// reserving and calling the provider.
fn orphaned_reservation(user_id: Uuid, order_ref: &str, age: Duration) -> payment::ActiveModel {
    let created_at = Utc::now() - age;
    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        amount: Set(dec!(25.00)),
        order_ref: Set(order_ref.to_string()),
        session_id: Set(None),
        customer_id: Set(None),
        status: Set(PaymentStatus::Initial),
        checkout_url: Set(None),
        response: Set(None),
        line_items: Set(json!([])),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
}

#[tokio::test]
async fn stale_reservation_is_released_on_next_checkout() {
    let app = TestApp::new().await;
    let (user_id, _) = buyer_with_cart(&app).await;
    let db = &*app.state.db;
    let orphan = PaymentRepository::insert(
        db,
        orphaned_reservation(user_id, "20000001", Duration::hours(1)),
    )
    .await
    .unwrap();

    let outcome = app
        .state
        .services
        .checkout
        .initiate_checkout(user_id)
        .await
        .unwrap();
    assert!(outcome.is_created());
    assert_ne!(outcome.payment().id, orphan.id);
    assert_eq!(app.gateway.sessions_created(), 1);

    let history = PaymentRepository::list_for_user(db, user_id).await.unwrap();
    let released = history.iter().find(|p| p.id == orphan.id).unwrap();
    assert_eq!(released.status, PaymentStatus::Failed);
    assert_eq!(
        released.response.as_deref(),
        Some("abandoned before a provider session was created")
    );
}

#[tokio::test]
async fn fresh_reservation_without_session_still_blocks() {
    let app = TestApp::new().await;
    let (user_id, _) = buyer_with_cart(&app).await;
    PaymentRepository::insert(
        &*app.state.db,
        orphaned_reservation(user_id, "20000002", Duration::seconds(1)),
    )
    .await
    .unwrap();
    let checkout = &app.state.services.checkout;

    assert_matches!(
        checkout.initiate_checkout(user_id).await,
        Err(ServiceError::Conflict(msg)) if msg == "checkout already in progress"
    );
    assert_matches!(
        checkout.confirm_payment(user_id).await,
        Err(ServiceError::Conflict(msg)) if msg == "checkout session is still being created"
    );
    assert_eq!(app.gateway.sessions_created(), 0);
}

#[tokio::test]
async fn confirming_a_stale_reservation_releases_it() {
    let app = TestApp::new().await;
    let (user_id, _) = buyer_with_cart(&app).await;
    let db = &*app.state.db;
    PaymentRepository::insert(
        db,
        orphaned_reservation(user_id, "20000003", Duration::hours(1)),
    )
    .await
    .unwrap();
    let checkout = &app.state.services.checkout;

    assert_matches!(
        checkout.confirm_payment(user_id).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(PaymentRepository::find_active(db, user_id)
        .await
        .unwrap()
        .is_none());
    assert!(checkout.initiate_checkout(user_id).await.unwrap().is_created());
}

#[tokio::test]
async fn concurrent_checkouts_open_a_single_session() {
    let app = TestApp::new().await;
    let (user_id, _) = buyer_with_cart(&app).await;
    let checkout = &app.state.services.checkout;

    let (first, second) = tokio::join!(
        checkout.initiate_checkout(user_id),
        checkout.initiate_checkout(user_id)
    );
    let outcomes = [first, second];
    let created = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(CheckoutOutcome::Created(_))))
        .count();
    assert_eq!(created, 1, "{:?}", outcomes);
    for outcome in &outcomes {
        assert_matches!(
            outcome,
            Ok(CheckoutOutcome::Created(_))
                | Ok(CheckoutOutcome::Resumed(_))
                | Err(ServiceError::Conflict(_))
        );
    }

    assert_eq!(app.gateway.sessions_created(), 1);
    let history = PaymentRepository::list_for_user(&*app.state.db, user_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn losing_the_reservation_race_reports_a_conflict() {
    let app = TestApp::new().await;
    let (user_id, _) = buyer_with_cart(&app).await;
    let db = &*app.state.db;

    // A competing reservation lands between the active-payment read and the
    // insert, inside the same transaction, so rolling back removes both.
    db.execute_unprepared(
        "CREATE TRIGGER competing_reservation BEFORE INSERT ON payments \
         WHEN NEW.order_ref NOT LIKE 'X%' \
         BEGIN \
           INSERT INTO payments (id, user_id, amount, order_ref, status, line_items, created_at, updated_at) \
           VALUES (randomblob(16), NEW.user_id, NEW.amount, 'X' || NEW.order_ref, 'initial', \
                   NEW.line_items, NEW.created_at, NEW.updated_at); \
         END",
    )
    .await
    .unwrap();

    assert_matches!(
        app.state.services.checkout.initiate_checkout(user_id).await,
        Err(ServiceError::Conflict(msg)) if msg == "checkout already in progress"
    );
    assert_eq!(app.gateway.sessions_created(), 0);
    assert!(PaymentRepository::list_for_user(db, user_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(app.state.services.cart.get_cart(user_id).await.unwrap().items.len(), 1);
}
