//! Application-wide error types.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use fund_me::FundMeError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Price feed error: {0}")]
    Feed(String),

    #[error(transparent)]
    Ledger(#[from] FundMeError),
}

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl NodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(err) => match err {
                FundMeError::Unauthorized(_) => StatusCode::FORBIDDEN,
                FundMeError::Reentrancy => StatusCode::CONFLICT,
                FundMeError::TransferFailed { .. } => StatusCode::BAD_GATEWAY,
                FundMeError::InvalidPrice => StatusCode::SERVICE_UNAVAILABLE,
                FundMeError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
                FundMeError::BelowThreshold { .. }
                | FundMeError::InsufficientBalance { .. }
                | FundMeError::NotAnActiveFunder(_)
                | FundMeError::NoOpChange
                | FundMeError::InvalidAmount
                | FundMeError::Overflow => StatusCode::UNPROCESSABLE_ENTITY,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let code = match &self {
            Self::Ledger(err) => Some(err.code()),
            _ => None,
        };
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
                code,
            }),
        )
            .into_response()
    }
}
