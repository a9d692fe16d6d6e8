use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::StockError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Stock(#[from] StockError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Stock(StockError::InvalidDate { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Stock(StockError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Stock(StockError::Provider(_) | StockError::Database(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let detail = self.to_string();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", detail);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
