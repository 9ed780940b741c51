use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ApiResponse;

/// 200 with the standard envelope.
pub fn success_response<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse::new(message, data))
}

/// 201 with the standard envelope.
pub fn created_response<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::new(message, data)))
}

/// Payload of delete endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Deleted {
    pub id: Uuid,
}
