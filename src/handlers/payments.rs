use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::checkout::{CheckoutLink, CheckoutOutcome, PaymentConfirmation},
    ApiResponse, AppState,
};

/// Open a hosted checkout for the caller's cart, or return the one already open
#[utoipa::path(
    get,
    path = "/payment",
    tag = "Payments",
    responses(
        (status = 201, description = "Checkout session created", body = ApiResponse<CheckoutLink>),
        (status = 200, description = "Existing checkout session resumed", body = ApiResponse<CheckoutLink>),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 409, description = "Checkout is being created by another request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn initiate_checkout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutLink>>), ServiceError> {
    let outcome = state
        .services
        .checkout
        .initiate_checkout(auth_user.user_id)
        .await?;

    let (status, message) = match &outcome {
        CheckoutOutcome::Created(_) => (StatusCode::CREATED, "checkout session created"),
        CheckoutOutcome::Resumed(_) => (StatusCode::OK, "checkout session already active"),
    };
    let link = CheckoutLink::from(outcome.payment());
    Ok((status, Json(ApiResponse::new(message, link))))
}

/// Refresh the active payment from the provider; a paid session places the order
#[utoipa::path(
    get,
    path = "/payment/verify",
    tag = "Payments",
    responses(
        (status = 200, description = "Payment status refreshed", body = ApiResponse<PaymentConfirmation>),
        (status = 404, description = "No active payment", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaymentConfirmation>>, ServiceError> {
    let confirmation = state
        .services
        .checkout
        .confirm_payment(auth_user.user_id)
        .await?;
    let message = match &confirmation.order {
        Some(_) => "payment confirmed",
        None => "payment status updated",
    };
    Ok(Json(ApiResponse::new(message, confirmation)))
}
