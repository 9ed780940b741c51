use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::{created_response, success_response};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::users::{
        AuthToken, BecomeSellerInput, CreateProfileInput, LoginInput, SignupInput,
        UpdateProfileInput, UserProfile, VerifyCodeInput,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerificationRequested {
    pub expires_at: DateTime<Utc>,
}

/// Register a buyer account
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "Users",
    request_body = SignupInput,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthToken>),
        (status = 400, description = "Invalid email or password", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<SignupInput>,
) -> Result<(StatusCode, Json<ApiResponse<AuthToken>>), ServiceError> {
    let token = state.services.users.signup(input).await?;
    Ok(created_response("account created", token))
}

#[utoipa::path(
    post,
    path = "/users/login",
    tag = "Users",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthToken>),
        (status = 401, description = "Wrong password", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown email", body = crate::errors::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<ApiResponse<AuthToken>>, ServiceError> {
    let token = state.services.users.login(input).await?;
    Ok(success_response("logged in", token))
}

/// Text a verification code to the caller's phone
#[utoipa::path(
    get,
    path = "/users/verify",
    tag = "Users",
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<VerificationRequested>),
        (status = 409, description = "Already verified", body = crate::errors::ErrorResponse),
        (status = 502, description = "SMS delivery failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn request_verification_code(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<VerificationRequested>>, ServiceError> {
    let expires_at = state
        .services
        .users
        .request_verification_code(auth_user.user_id)
        .await?;
    Ok(success_response(
        "verification code sent",
        VerificationRequested { expires_at },
    ))
}

#[utoipa::path(
    post,
    path = "/users/verify",
    tag = "Users",
    request_body = VerifyCodeInput,
    responses(
        (status = 200, description = "Phone verified", body = ApiResponse<UserProfile>),
        (status = 400, description = "Wrong or expired code", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already verified", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn verify_code(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<VerifyCodeInput>,
) -> Result<Json<ApiResponse<UserProfile>>, ServiceError> {
    let profile = state
        .services
        .users
        .verify_code(auth_user.user_id, input)
        .await?;
    Ok(success_response("user verified", profile))
}

#[utoipa::path(
    post,
    path = "/users/profile",
    tag = "Users",
    request_body = CreateProfileInput,
    responses(
        (status = 201, description = "Profile created", body = ApiResponse<UserProfile>),
        (status = 409, description = "Profile already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateProfileInput>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ServiceError> {
    let profile = state
        .services
        .users
        .create_profile(auth_user.user_id, input)
        .await?;
    Ok(created_response("profile created", profile))
}

#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Caller profile", body = ApiResponse<UserProfile>),
    ),
    security(("Bearer" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, ServiceError> {
    let profile = state.services.users.get_profile(auth_user.user_id).await?;
    Ok(success_response("profile retrieved", profile))
}

#[utoipa::path(
    patch,
    path = "/users/profile",
    tag = "Users",
    request_body = UpdateProfileInput,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<ApiResponse<UserProfile>>, ServiceError> {
    let profile = state
        .services
        .users
        .update_profile(auth_user.user_id, input)
        .await?;
    Ok(success_response("profile updated", profile))
}

/// Upgrade the caller to a seller. The response carries a fresh token with the
/// seller role; older tokens keep the buyer role until they expire.
#[utoipa::path(
    post,
    path = "/users/become-seller",
    tag = "Users",
    request_body = BecomeSellerInput,
    responses(
        (status = 200, description = "Upgraded to seller", body = ApiResponse<AuthToken>),
        (status = 409, description = "Already a seller", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn become_seller(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<BecomeSellerInput>,
) -> Result<Json<ApiResponse<AuthToken>>, ServiceError> {
    let token = state
        .services
        .users
        .become_seller(auth_user.user_id, input)
        .await?;
    Ok(success_response("seller account activated", token))
}
