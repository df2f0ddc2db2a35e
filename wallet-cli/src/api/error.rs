//! API error type and the mapping from engine errors to HTTP responses
//!
//! | Engine error       | HTTP | Code                      |
//! |--------------------|------|---------------------------|
//! | InvalidAmount      | 400  | `INVALID_AMOUNT`          |
//! | WalletNotFound     | 404  | `WALLET_NOT_FOUND`        |
//! | InsufficientFunds  | 400  | `INSUFFICIENT_FUNDS`      |
//! | OptimisticLock     | 409  | `CONCURRENT_MODIFICATION` |
//! | Storage            | 500  | `INTERNAL_ERROR`          |

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use wallet_core::WalletError;

/// JSON error body: `{code, message, details?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// An [`ApiError`] together with its status code
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// Malformed id or body
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiError::new("INVALID_REQUEST", message),
        )
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiError::new("INVALID_AMOUNT", message),
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<WalletError> for ApiErrorResponse {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::InvalidAmount(amount) => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "INVALID_AMOUNT",
                    "Amount must be positive with at most two decimal places",
                    serde_json::json!({ "amount": amount.to_string() }),
                ),
            ),
            WalletError::WalletNotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                ApiError::with_details(
                    "WALLET_NOT_FOUND",
                    "Wallet not found",
                    serde_json::json!({ "walletId": id }),
                ),
            ),
            WalletError::InsufficientFunds {
                available,
                requested,
            } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "INSUFFICIENT_FUNDS",
                    "Insufficient funds",
                    serde_json::json!({
                        "available": available.to_string(),
                        "requested": requested.to_string(),
                    }),
                ),
            ),
            WalletError::OptimisticLock { wallet_id, version } => Self::new(
                StatusCode::CONFLICT,
                ApiError::with_details(
                    "CONCURRENT_MODIFICATION",
                    "Wallet was modified by another request, please retry",
                    serde_json::json!({ "walletId": wallet_id, "version": version }),
                ),
            ),
            // Storage details stay in the logs
            WalletError::Storage(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", "Internal server error"),
            ),
        }
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiError::new("PAYLOAD_TOO_LARGE", rejection.body_text()),
            );
        }
        Self::invalid_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}
