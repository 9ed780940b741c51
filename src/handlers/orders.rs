use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::AuthUser, errors::ServiceError, repositories::OrderWithItems, ApiResponse, AppState,
};

/// Place an order from the caller's cart
#[utoipa::path(
    post,
    path = "/users/order",
    tag = "Orders",
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<OrderWithItems>>), ServiceError> {
    let order = state.services.orders.create_order(auth_user.user_id).await?;
    Ok(created_response("order created", order))
}

#[utoipa::path(
    get,
    path = "/users/order",
    tag = "Orders",
    responses((status = 200, description = "Caller's orders", body = ApiResponse<Vec<OrderWithItems>>)),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderWithItems>>>, ServiceError> {
    let orders = state.services.orders.get_orders(auth_user.user_id).await?;
    Ok(success_response("orders retrieved", orders))
}

#[utoipa::path(
    get,
    path = "/users/order/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "No such order for this user", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderWithItems>>, ServiceError> {
    let order = state
        .services
        .orders
        .get_order(auth_user.user_id, id)
        .await?;
    Ok(success_response("order retrieved", order))
}
