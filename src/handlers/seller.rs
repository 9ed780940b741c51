//! Seller-only endpoints. The router applies the seller role check; handlers
//! pass the caller id through so services can enforce product ownership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, success_response, Deleted};
use crate::{
    auth::AuthUser,
    entities::{category, product},
    errors::ServiceError,
    repositories::SellerOrderLine,
    services::{
        catalog::{
            CreateCategoryInput, CreateProductInput, RestockInput, UpdateCategoryInput,
            UpdateProductInput,
        },
        orders::SellerOrderDetail,
    },
    ApiResponse, AppState,
};

#[utoipa::path(
    post,
    path = "/seller/categories",
    tag = "Seller",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<category::Model>),
        (status = 400, description = "Invalid input or unknown parent", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not a seller", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<category::Model>>), ServiceError> {
    let category = state.services.catalog.create_category(input).await?;
    Ok(created_response("category created", category))
}

#[utoipa::path(
    patch,
    path = "/seller/categories/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryInput,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<category::Model>),
        (status = 404, description = "Unknown category", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    let category = state.services.catalog.update_category(id, input).await?;
    Ok(success_response("category updated", category))
}

#[utoipa::path(
    delete,
    path = "/seller/categories/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Unknown category", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(success_response("category deleted", Deleted { id }))
}

#[utoipa::path(
    post,
    path = "/seller/products",
    tag = "Seller",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 400, description = "Invalid input or unknown category", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let product = state
        .services
        .catalog
        .create_product(auth_user.user_id, input)
        .await?;
    Ok(created_response("product created", product))
}

#[utoipa::path(
    get,
    path = "/seller/products",
    tag = "Seller",
    responses((status = 200, description = "Caller's products", body = ApiResponse<Vec<product::Model>>)),
    security(("Bearer" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    let products = state
        .services
        .catalog
        .list_seller_products(auth_user.user_id)
        .await?;
    Ok(success_response("products retrieved", products))
}

#[utoipa::path(
    get,
    path = "/seller/products/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<product::Model>),
        (status = 403, description = "Owned by another seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state
        .services
        .catalog
        .get_seller_product(auth_user.user_id, id)
        .await?;
    Ok(success_response("product retrieved", product))
}

/// Partial edit; omitted fields are left unchanged
#[utoipa::path(
    put,
    path = "/seller/products/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<product::Model>),
        (status = 403, description = "Owned by another seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state
        .services
        .catalog
        .update_product(auth_user.user_id, id, input)
        .await?;
    Ok(success_response("product updated", product))
}

/// Set the absolute stock level
#[utoipa::path(
    patch,
    path = "/seller/products/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = RestockInput,
    responses(
        (status = 200, description = "Product restocked", body = ApiResponse<product::Model>),
        (status = 403, description = "Owned by another seller", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn restock_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<RestockInput>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state
        .services
        .catalog
        .restock_product(auth_user.user_id, id, input)
        .await?;
    Ok(success_response("product restocked", product))
}

#[utoipa::path(
    delete,
    path = "/seller/products/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Owned by another seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>, ServiceError> {
    state
        .services
        .catalog
        .delete_product(auth_user.user_id, id)
        .await?;
    Ok(success_response("product deleted", Deleted { id }))
}

#[utoipa::path(
    get,
    path = "/seller/orders",
    tag = "Seller",
    responses((status = 200, description = "Lines sold by the caller", body = ApiResponse<Vec<SellerOrderLine>>)),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<SellerOrderLine>>>, ServiceError> {
    let lines = state
        .services
        .orders
        .seller_orders(auth_user.user_id)
        .await?;
    Ok(success_response("orders retrieved", lines))
}

#[utoipa::path(
    get,
    path = "/seller/orders/{id}",
    tag = "Seller",
    params(("id" = Uuid, Path, description = "Order item id")),
    responses(
        (status = 200, description = "Sold line with buyer contact", body = ApiResponse<SellerOrderDetail>),
        (status = 404, description = "Not one of the caller's lines", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SellerOrderDetail>>, ServiceError> {
    let detail = state
        .services
        .orders
        .seller_order(auth_user.user_id, id)
        .await?;
    Ok(success_response("order retrieved", detail))
}
