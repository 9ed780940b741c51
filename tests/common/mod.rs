#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shopfront_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{category, product},
    handlers::AppServices,
    notifications::{SmsError, SmsSender},
    payments::{CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway, SessionStatus},
    services::{
        catalog::{CreateCategoryInput, CreateProductInput},
        users::{BecomeSellerInput, SignupInput},
    },
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PHONE: &str = "+15550100";

/// Payment provider double. Counts session creations and reports whatever
/// status the test configured.
pub struct FakeGateway {
    created: AtomicUsize,
    fail_create: AtomicBool,
    status: Mutex<SessionStatus>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            status: Mutex::new(SessionStatus::Open),
        }
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn fail_next_sessions(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn settle_as(&self, status: SessionStatus) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 400,
                body: "card_declined".to_string(),
            });
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let session_id = format!("cs_test_{}", request.order_ref);
        Ok(CheckoutSession {
            url: format!("https://checkout.test/{}", session_id),
            session_id,
            customer_id: Some(format!("cus_{}", request.user_id.simple())),
        })
    }

    async fn session_status(&self, _session_id: &str) -> Result<SessionStatus, GatewayError> {
        Ok(*self.status.lock().unwrap())
    }
}

/// SMS double that keeps every message it was asked to send.
#[derive(Default)]
pub struct FakeSms {
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeSms {
    pub fn last(&self) -> Option<(String, String)> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Six-digit code from the most recent message.
    pub fn last_code(&self) -> i32 {
        let (_, body) = self.last().expect("no sms sent");
        body.rsplit(' ')
            .next()
            .and_then(|code| code.parse().ok())
            .expect("sms carries a numeric code")
    }
}

#[async_trait]
impl SmsSender for FakeSms {
    async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), body.to_string()));
        Ok(())
    }
}

/// Application wired against an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth: Arc<AuthService>,
    pub gateway: Arc<FakeGateway>,
    pub sms: Arc<FakeSms>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One shared connection keeps the in-memory database alive.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(cfg.jwt_expiration_secs),
        )));
        let gateway = Arc::new(FakeGateway::new());
        let sms = Arc::new(FakeSms::default());

        let services = AppServices::new(
            db.clone(),
            auth.clone(),
            gateway.clone(),
            sms.clone(),
            Duration::from_secs(cfg.verification_code_ttl_secs),
            cfg.http_client_timeout(),
        );
        let state = AppState {
            db,
            config: cfg,
            services,
        };
        let router = shopfront_api::build_router(state.clone(), auth.clone());

        Self {
            router,
            state,
            auth,
            gateway,
            sms,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and returns the status plus the decoded JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Registers a buyer with a phone number. Returns `(user_id, token)`.
    pub async fn signup(&self, email: &str) -> (Uuid, String) {
        let auth = self
            .state
            .services
            .users
            .signup(SignupInput {
                email: email.to_string(),
                password: "hunter22".to_string(),
                phone: Some(TEST_PHONE.to_string()),
            })
            .await
            .expect("signup failed");
        (auth.user.id, auth.token)
    }

    /// Registers a user and upgrades them to seller. Returns `(user_id, token)`.
    pub async fn seller(&self, email: &str) -> (Uuid, String) {
        let (user_id, _) = self.signup(email).await;
        let auth = self
            .state
            .services
            .users
            .become_seller(
                user_id,
                BecomeSellerInput {
                    first_name: "Sam".to_string(),
                    last_name: "Vendor".to_string(),
                    phone: TEST_PHONE.to_string(),
                    account_number: "DE89370400440532013000".to_string(),
                    swift_code: "DEUTDEFF".to_string(),
                    payment_type: "bank_transfer".to_string(),
                },
            )
            .await
            .expect("become_seller failed");
        (user_id, auth.token)
    }

    pub async fn category(&self, name: &str) -> category::Model {
        self.state
            .services
            .catalog
            .create_category(CreateCategoryInput {
                name: name.to_string(),
                parent_id: None,
                image_url: None,
                display_order: None,
            })
            .await
            .expect("category creation failed")
    }

    pub async fn product(
        &self,
        seller_id: Uuid,
        category_id: Uuid,
        name: &str,
        price: Decimal,
    ) -> product::Model {
        self.state
            .services
            .catalog
            .create_product(
                seller_id,
                CreateProductInput {
                    name: name.to_string(),
                    description: format!("{} description", name),
                    category_id,
                    image_url: Some("https://img.test/p.png".to_string()),
                    price,
                    stock: 10,
                },
            )
            .await
            .expect("product creation failed")
    }

    pub async fn add_to_cart(&self, token: &str, product_id: Uuid, quantity: i32) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/users/cart",
                Some(json!({ "product_id": product_id, "quantity": quantity })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add_to_cart failed: {}", body);
        body
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Parses a decimal that serde may have emitted as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}
