use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced to the caller of a ledger, lookup or classification operation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("nutrition lookup failed: {0}")]
    LookupFailure(String),

    #[error("ledger unavailable: {0}")]
    StorageRead(String),

    #[error("ledger write rejected: {0}")]
    StorageWrite(String),

    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::LookupFailure(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::LookupFailure(_) => StatusCode::BAD_GATEWAY,
            Self::StorageRead(_) | Self::StorageWrite(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ClassificationUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
