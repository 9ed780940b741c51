//! Shopfront API Library
//!
//! Marketplace backend: accounts and seller upgrade, catalog, carts, orders
//! and hosted checkout.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod money;
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    extract::Request,
    middleware::Next,
    routing::{get, post},
    Extension, Router,
};
use chrono::Utc;
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService};
use crate::entities::user::UserRole;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Routes reachable without a token.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/users/register", post(handlers::users::register))
        .route("/users/login", post(handlers::users::login))
        .route("/products", get(handlers::catalog::list_products))
        .route("/products/:id", get(handlers::catalog::get_product))
        .route("/categories", get(handlers::catalog::list_categories))
        .route("/categories/:id", get(handlers::catalog::get_category))
}

/// Routes for any signed-in user.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/verify",
            get(handlers::users::request_verification_code).post(handlers::users::verify_code),
        )
        .route(
            "/users/profile",
            post(handlers::users::create_profile)
                .get(handlers::users::get_profile)
                .patch(handlers::users::update_profile),
        )
        .route("/users/become-seller", post(handlers::users::become_seller))
        .route(
            "/users/cart",
            post(handlers::cart::add_to_cart).get(handlers::cart::get_cart),
        )
        .route(
            "/users/order",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/users/order/:id", get(handlers::orders::get_order))
        .route("/payment", get(handlers::payments::initiate_checkout))
        .route("/payment/verify", get(handlers::payments::confirm_payment))
        .with_auth()
}

/// Routes restricted to sellers.
fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/seller/categories", post(handlers::seller::create_category))
        .route(
            "/seller/categories/:id",
            axum::routing::patch(handlers::seller::update_category)
                .delete(handlers::seller::delete_category),
        )
        .route(
            "/seller/products",
            post(handlers::seller::create_product).get(handlers::seller::list_products),
        )
        .route(
            "/seller/products/:id",
            get(handlers::seller::get_product)
                .put(handlers::seller::update_product)
                .patch(handlers::seller::restock_product)
                .delete(handlers::seller::delete_product),
        )
        .route("/seller/orders", get(handlers::seller::list_orders))
        .route("/seller/orders/:id", get(handlers::seller::get_order))
        .with_role(UserRole::Seller)
}

/// Builds the CORS layer from configuration. Explicit origins win; otherwise
/// development (or an explicit override) gets a permissive policy and other
/// environments allow no cross-origin callers.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Assembles the full HTTP application.
pub fn build_router(state: AppState, auth: Arc<AuthService>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes())
        .merge(user_routes())
        .merge(seller_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http().make_span_with(crate::tracing::RequestSpanMaker))
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(cors)
        .layer(Extension(auth))
        .layer(axum::middleware::from_fn(log_request_outcome))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn log_request_outcome(request: Request, next: Next) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    ::tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn envelope_carries_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::new("ok", 5)
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        chrono::DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");

        let json = serde_json::to_value(ApiResponse::new("created", "x")).unwrap();
        assert_eq!(json["message"], "created");
        assert_eq!(json["data"], "x");
    }
}
