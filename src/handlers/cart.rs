use axum::{extract::State, Json};

use super::common::success_response;
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::cart::{AddToCartInput, CartView},
    ApiResponse, AppState,
};

/// Add, change or remove (quantity 0) a cart line
#[utoipa::path(
    post,
    path = "/users/cart",
    tag = "Cart",
    request_body = AddToCartInput,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<AddToCartInput>,
) -> Result<Json<ApiResponse<CartView>>, ServiceError> {
    let cart = state
        .services
        .cart
        .add_to_cart(auth_user.user_id, input)
        .await?;
    Ok(success_response("cart updated", cart))
}

#[utoipa::path(
    get,
    path = "/users/cart",
    tag = "Cart",
    responses((status = 200, description = "Current cart", body = ApiResponse<CartView>)),
    security(("Bearer" = []))
)]
pub async fn get_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<CartView>>, ServiceError> {
    let cart = state.services.cart.get_cart(auth_user.user_id).await?;
    Ok(success_response("cart retrieved", cart))
}
