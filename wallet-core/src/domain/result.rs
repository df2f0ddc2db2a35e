//! Result and error types for the wallet engine

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Every way a wallet operation can fail.
///
/// Adapters switch on the variant (or on [`WalletError::kind`]); the message
/// text is for humans only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid amount: {0} (must be positive with at most two decimal places)")]
    InvalidAmount(Decimal),

    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    #[error("Insufficient funds. Available: {available}, Requested: {requested}")]
    InsufficientFunds { available: Decimal, requested: Decimal },

    #[error("Wallet {wallet_id} was modified by another process (version {version} already exists), please retry")]
    OptimisticLock { wallet_id: Uuid, version: u64 },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse category of a [`WalletError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, rejected before touching the store
    Validation,
    /// Rejected after reading current state, before any write
    BusinessRule,
    /// Stale write; re-read and retry
    Concurrency,
    /// Unexpected storage failure
    Storage,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::InvalidAmount(_) => ErrorKind::Validation,
            WalletError::WalletNotFound(_) | WalletError::InsufficientFunds { .. } => {
                ErrorKind::BusinessRule
            }
            WalletError::OptimisticLock { .. } => ErrorKind::Concurrency,
            WalletError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Only concurrency faults are worth retrying with a fresh read
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Wallet engine result type
pub type Result<T> = std::result::Result<T, WalletError>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                context.insert("kind".to_string(), serde_json::json!(e.kind()));
                context.insert("retryable".to_string(), serde_json::json!(e.is_retryable()));
                Self::fail_with_context(e.to_string(), context)
            }
        }
    }
}
