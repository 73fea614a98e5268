use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl AppError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message.to_string(),
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Db(err) => {
                tracing::error!("database error: {err}");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            StoreError::NotFound(message) => AppError::new(StatusCode::NOT_FOUND, message),
            StoreError::ScopeMismatch(message) => AppError::new(StatusCode::BAD_REQUEST, message),
            StoreError::InvalidReorderSet => AppError::new(
                StatusCode::BAD_REQUEST,
                "Reorder list does not match the current members",
            ),
            StoreError::LastColumnNotEmpty => AppError::new(
                StatusCode::CONFLICT,
                "Cannot delete the last column while it still holds cards",
            ),
        }
    }
}
