//! Hosted checkout with a single active payment per user.
//!
//! A payment row is reserved in `initial` before the provider is called. The
//! partial unique index on `payments (user_id) WHERE status IN ('initial',
//! 'pending')` makes a concurrent second reservation fail, and that request
//! resumes the winner instead of opening another provider session.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        cart_item::LineSnapshot,
        payment::{self, PaymentStatus},
    },
    errors::{is_unique_violation, ServiceError},
    money,
    payments::{CheckoutSessionRequest, PaymentGateway, SessionStatus},
    repositories::{CartRepository, OrderWithItems, PaymentRepository},
    services::{cart::consume_lines, orders::materialize_order, reference},
};

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// A new provider session was opened.
    Created(payment::Model),
    /// The caller already had an open session; it is returned unchanged.
    Resumed(payment::Model),
}

impl CheckoutOutcome {
    pub fn payment(&self) -> &payment::Model {
        match self {
            Self::Created(p) | Self::Resumed(p) => p,
        }
    }

    pub fn into_payment(self) -> payment::Model {
        match self {
            Self::Created(p) | Self::Resumed(p) => p,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Checkout link handed back to the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutLink {
    pub payment_id: Uuid,
    pub order_ref: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
}

impl From<&payment::Model> for CheckoutLink {
    fn from(payment: &payment::Model) -> Self {
        Self {
            payment_id: payment.id,
            order_ref: payment.order_ref.clone(),
            amount: payment.amount,
            status: payment.status,
            checkout_url: payment.checkout_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentConfirmation {
    pub payment: payment::Model,
    pub order: Option<OrderWithItems>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    reservation_timeout: Duration,
}

impl CheckoutService {
    /// A reservation still waiting for its provider session after
    /// `reservation_timeout` is treated as abandoned.
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        reservation_timeout: std::time::Duration,
    ) -> Self {
        Self {
            db,
            gateway,
            reservation_timeout: Duration::from_std(reservation_timeout)
                .unwrap_or_else(|_| Duration::minutes(1)),
        }
    }

    #[instrument(skip(self))]
    pub async fn initiate_checkout(&self, user_id: Uuid) -> Result<CheckoutOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        if let Some(active) = PaymentRepository::find_active(&txn, user_id).await? {
            if self.is_abandoned(&active, Utc::now()) {
                warn!(payment_id = %active.id, "releasing abandoned checkout reservation");
                abandon(&txn, active).await?;
            } else {
                txn.commit().await?;
                return resume(active);
            }
        }

        let lines = CartRepository::lines(&txn, user_id).await?;
        if lines.is_empty() {
            txn.commit().await?;
            return Err(ServiceError::InvalidOperation("cart is empty".to_string()));
        }
        let amount = money::sum_lines(lines.iter().map(|line| (line.price, line.quantity)));
        let snapshot: Vec<LineSnapshot> = lines.into_iter().map(LineSnapshot::from).collect();
        let line_items = serde_json::to_value(&snapshot)
            .map_err(|err| ServiceError::InternalError(format!("cart snapshot failed: {}", err)))?;
        let order_ref = reference::unique_order_ref(&txn).await?;

        let now = Utc::now();
        let reservation = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            amount: Set(amount),
            order_ref: Set(order_ref),
            session_id: Set(None),
            customer_id: Set(None),
            status: Set(PaymentStatus::Initial),
            checkout_url: Set(None),
            response: Set(None),
            line_items: Set(line_items),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let reserved = match PaymentRepository::insert(&txn, reservation).await {
            Ok(reserved) => reserved,
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                warn!(user_id = %user_id, "concurrent checkout detected, resuming existing payment");
                let winner = PaymentRepository::find_active(&*self.db, user_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Conflict("checkout already in progress".to_string())
                    })?;
                return resume(winner);
            }
            Err(err) => return Err(err.into()),
        };
        txn.commit().await?;

        let request = CheckoutSessionRequest {
            user_id,
            order_ref: reserved.order_ref.clone(),
            amount,
        };

        let session = match self.gateway.create_session(&request).await {
            Ok(session) => session,
            Err(err) => {
                error!(payment_id = %reserved.id, error = %err, "payment provider rejected checkout");
                let mut failed = reserved.into_active_model();
                failed.status = Set(PaymentStatus::Failed);
                failed.response = Set(Some(err.to_string()));
                failed.updated_at = Set(Utc::now());
                PaymentRepository::update(&*self.db, failed).await?;
                return Err(err.into());
            }
        };

        let mut active = reserved.into_active_model();
        active.session_id = Set(Some(session.session_id));
        active.customer_id = Set(session.customer_id);
        active.checkout_url = Set(Some(session.url));
        active.updated_at = Set(Utc::now());
        let payment = PaymentRepository::update(&*self.db, active).await?;

        info!(
            payment_id = %payment.id,
            order_ref = %payment.order_ref,
            amount = %payment.amount,
            "checkout session created"
        );
        Ok(CheckoutOutcome::Created(payment))
    }

    /// Asks the provider how the active session settled and applies it. A
    /// paid session becomes an order built from the lines that were charged,
    /// whatever the cart holds now.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, user_id: Uuid) -> Result<PaymentConfirmation, ServiceError> {
        let payment = PaymentRepository::find_active(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("no active payment".to_string()))?;
        let Some(session_id) = payment.session_id.clone() else {
            if self.is_abandoned(&payment, Utc::now()) {
                warn!(payment_id = %payment.id, "releasing abandoned checkout reservation");
                abandon(&*self.db, payment).await?;
                return Err(ServiceError::NotFound("no active payment".to_string()));
            }
            return Err(ServiceError::Conflict(
                "checkout session is still being created".to_string(),
            ));
        };

        let status = self.gateway.session_status(&session_id).await?;
        let now = Utc::now();

        match status {
            SessionStatus::Paid => {
                let lines = payment.lines().map_err(|err| {
                    ServiceError::InternalError(format!("unreadable payment lines: {}", err))
                })?;

                let txn = self.db.begin().await?;
                let order = materialize_order(
                    &txn,
                    user_id,
                    payment.order_ref.clone(),
                    lines.clone(),
                    Some(&payment),
                )
                .await?;
                consume_lines(&txn, user_id, &lines).await?;

                let mut settled = payment.into_active_model();
                settled.status = Set(PaymentStatus::Success);
                settled.response = Set(Some(status.to_string()));
                settled.updated_at = Set(now);
                let payment = PaymentRepository::update(&txn, settled).await?;
                txn.commit().await?;

                info!(payment_id = %payment.id, order_id = %order.order.id, "payment settled");
                Ok(PaymentConfirmation {
                    payment,
                    order: Some(order),
                })
            }
            SessionStatus::Expired | SessionStatus::Open => {
                let next = if status == SessionStatus::Expired {
                    PaymentStatus::Failed
                } else {
                    PaymentStatus::Pending
                };
                let mut active = payment.into_active_model();
                active.status = Set(next);
                active.response = Set(Some(status.to_string()));
                active.updated_at = Set(now);
                let payment = PaymentRepository::update(&*self.db, active).await?;

                info!(payment_id = %payment.id, status = %payment.status, "payment status refreshed");
                Ok(PaymentConfirmation {
                    payment,
                    order: None,
                })
            }
        }
    }

    fn is_abandoned(&self, payment: &payment::Model, now: DateTime<Utc>) -> bool {
        payment.checkout_url.is_none() && now - payment.created_at > self.reservation_timeout
    }
}

fn resume(active: payment::Model) -> Result<CheckoutOutcome, ServiceError> {
    if active.checkout_url.is_some() {
        info!(payment_id = %active.id, "resuming active checkout");
        Ok(CheckoutOutcome::Resumed(active))
    } else {
        Err(ServiceError::Conflict(
            "checkout already in progress".to_string(),
        ))
    }
}

async fn abandon<C: ConnectionTrait>(
    conn: &C,
    reservation: payment::Model,
) -> Result<payment::Model, ServiceError> {
    let mut stale = reservation.into_active_model();
    stale.status = Set(PaymentStatus::Failed);
    stale.response = Set(Some("abandoned before a provider session was created".to_string()));
    stale.updated_at = Set(Utc::now());
    Ok(PaymentRepository::update(conn, stale).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::payments::{CheckoutSession, GatewayError, MockPaymentGateway};
    use assert_matches::assert_matches;

    const RESERVATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

    async fn memory_db() -> Arc<DatabaseConnection> {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        Arc::new(pool)
    }

    #[tokio::test]
    async fn empty_cart_never_reaches_the_provider() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_session().never();

        let service =
            CheckoutService::new(memory_db().await, Arc::new(gateway), RESERVATION_TIMEOUT);
        let result = service.initiate_checkout(Uuid::new_v4()).await;
        assert_matches!(result, Err(ServiceError::InvalidOperation(msg)) if msg == "cart is empty");
    }

    #[tokio::test]
    async fn confirm_without_active_payment_is_not_found() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_session_status().never();

        let service =
            CheckoutService::new(memory_db().await, Arc::new(gateway), RESERVATION_TIMEOUT);
        assert_matches!(
            service.confirm_payment(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[test]
    fn outcome_accessors() {
        let now = Utc::now();
        let payment = payment::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: Decimal::ONE,
            order_ref: "12345678".into(),
            session_id: Some("cs_1".into()),
            customer_id: None,
            status: PaymentStatus::Initial,
            checkout_url: Some("https://pay.example/cs_1".into()),
            response: None,
            line_items: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        };
        let created = CheckoutOutcome::Created(payment.clone());
        assert!(created.is_created());
        assert!(!CheckoutOutcome::Resumed(payment.clone()).is_created());
        assert_eq!(CheckoutLink::from(created.payment()).checkout_url, payment.checkout_url);

        let mut pending = payment;
        pending.checkout_url = None;
        assert_matches!(resume(pending), Err(ServiceError::Conflict(_)));
    }

    async fn seed_cart(db: &DatabaseConnection, user_id: Uuid) {
        use crate::entities::{cart_item, category, product};
        use crate::repositories::CatalogRepository;
        use rust_decimal_macros::dec;

        let now = Utc::now();
        let category = CatalogRepository::insert_category(
            db,
            category::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set("Gadgets".into()),
                parent_id: Set(None),
                image_url: Set(None),
                display_order: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await
        .unwrap();
        let product = CatalogRepository::insert_product(
            db,
            product::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set("Lamp".into()),
                description: Set(String::new()),
                category_id: Set(category.id),
                image_url: Set(None),
                price: Set(dec!(12.50)),
                stock: Set(5),
                seller_id: Set(Uuid::new_v4()),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await
        .unwrap();
        CartRepository::insert(
            db,
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                product_id: Set(product.id),
                name: Set(product.name),
                image_url: Set(None),
                seller_id: Set(product.seller_id),
                price: Set(product.price),
                quantity: Set(2),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn provider_failure_marks_payment_failed() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();
        seed_cart(&db, user_id).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_session()
            .times(1)
            .returning(|_| Err(GatewayError::Transport("connection reset".into())));

        let service =
            CheckoutService::new(db.clone(), Arc::new(gateway), RESERVATION_TIMEOUT);
        assert_matches!(
            service.initiate_checkout(user_id).await,
            Err(ServiceError::ProviderError(_))
        );

        assert!(PaymentRepository::find_active(&*db, user_id)
            .await
            .unwrap()
            .is_none());
        let history = PaymentRepository::list_for_user(&*db, user_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn provider_receives_cart_total() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();
        seed_cart(&db, user_id).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_session()
            .withf(move |req| req.user_id == user_id && req.amount == Decimal::from(25))
            .times(1)
            .returning(|req| {
                Ok(CheckoutSession {
                    session_id: format!("cs_{}", req.order_ref),
                    url: "https://pay.example/session".into(),
                    customer_id: Some("cus_1".into()),
                })
            });

        let service =
            CheckoutService::new(db, Arc::new(gateway), RESERVATION_TIMEOUT);
        let outcome = service.initiate_checkout(user_id).await.unwrap();
        assert!(outcome.is_created());
        let payment = outcome.into_payment();
        assert_eq!(payment.status, PaymentStatus::Initial);
        assert_eq!(payment.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(payment.session_id, Some(format!("cs_{}", payment.order_ref)));
    }
}
