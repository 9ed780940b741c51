pub mod cart;
pub mod catalog;
pub mod common;
pub mod health;
pub mod orders;
pub mod payments;
pub mod seller;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::AuthService,
    db::DbPool,
    notifications::SmsSender,
    payments::PaymentGateway,
    services::{CartService, CatalogService, CheckoutService, OrderService, UserService},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth_service: Arc<AuthService>,
        gateway: Arc<dyn PaymentGateway>,
        sms: Arc<dyn SmsSender>,
        verification_code_ttl: Duration,
        checkout_reservation_timeout: Duration,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(
                db_pool.clone(),
                auth_service,
                sms,
                verification_code_ttl,
            )),
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(db_pool.clone())),
            checkout: Arc::new(CheckoutService::new(
                db_pool,
                gateway,
                checkout_reservation_timeout,
            )),
        }
    }
}
