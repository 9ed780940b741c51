use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::success_response;
use crate::{
    entities::{category, product},
    errors::ServiceError,
    ApiResponse, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductQuery {
    /// Only products in this category
    pub category_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "Catalog",
    params(ProductQuery),
    responses((status = 200, description = "Products", body = ApiResponse<Vec<product::Model>>))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    let products = state
        .services
        .catalog
        .list_products(query.category_id)
        .await?;
    Ok(success_response("products retrieved", products))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<product::Model>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response("product retrieved", product))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Catalog",
    responses((status = 200, description = "Categories", body = ApiResponse<Vec<category::Model>>))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<category::Model>>>, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response("categories retrieved", categories))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<category::Model>),
        (status = 404, description = "Unknown category", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(success_response("category retrieved", category))
}
