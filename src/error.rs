use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::wallet::WalletError;

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "Internal Server Error")]
    InternalError,
    #[display(fmt = "Resource not found: {}", _0)]
    NotFound(String),
    #[display(fmt = "Bad request: {}", _0)]
    BadRequest(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::InternalError => HttpResponse::InternalServerError()
                .json(json!({"error": "Internal Server Error"})),
            AppError::NotFound(ref message) => HttpResponse::NotFound()
                .json(json!({"error": format!("Resource not found: {}", message)})),
            AppError::BadRequest(ref message) => HttpResponse::BadRequest()
                .json(json!({"error": message})),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<WalletError> for AppError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::UnknownRequest(id) => AppError::NotFound(format!("signature request {}", id)),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
