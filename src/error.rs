//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Catalog query failed; never surfaced as a partial schema.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// Composite or missing primary key; rejected instead of guessed.
    #[error("unsupported table: {0}")]
    UnsupportedTable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Execution(#[from] sqlx::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::CatalogUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "catalog_unavailable")
            }
            AppError::TableNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::InvalidRecord(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_record"),
            AppError::UnsupportedTable(_) => (StatusCode::BAD_REQUEST, "unsupported_table"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Execution(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
