//! Request handlers
//!
//! Handlers only translate: parse the request, call the engine once, map the
//! outcome. Conflicts are returned to the client as 409, never retried here.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wallet_core::domain::{operations, Receipt, RevisionMetadata};
use wallet_core::Wallet;

use super::error::ApiErrorResponse;
use super::{AppState, REQUEST_ID_HEADER};

/// Recorded as the `source` of revisions written over HTTP
const API_SOURCE: &str = "api";

type ApiResult<T> = Result<Json<T>, ApiErrorResponse>;

/// Body of credit and debit requests.
///
/// `amount` may be a JSON string (`"10.50"`, preferred) or a number.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub id: Uuid,
    pub balance: Decimal,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            balance: wallet.balance,
            version: wallet.version,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub balance: Decimal,
    pub version: u64,
    pub transaction_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl From<Receipt> for MutationResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            balance: receipt.wallet.balance,
            version: receipt.wallet.version,
            transaction_id: receipt.transaction_id,
            request_id: receipt.request_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub message: String,
    pub path: String,
    pub method: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub db: &'static str,
}

/// GET /v1/wallet/:id
pub async fn get_wallet(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<WalletResponse> {
    let Path(id) = id?;
    let wallet = state.wallet_service.get_wallet(id).await?;
    Ok(Json(wallet.into()))
}

/// POST /v1/wallet/:id/credit
pub async fn credit(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Path(id) = id?;
    let amount = parse_amount(&body?.amount)?;
    let receipt = state
        .wallet_service
        .credit_with(id, amount, request_metadata(&headers))
        .await?;
    Ok(Json(receipt.into()))
}

/// POST /v1/wallet/:id/debit
pub async fn debit(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Path(id) = id?;
    let amount = parse_amount(&body?.amount)?;
    let receipt = state
        .wallet_service
        .debit_with(id, amount, request_metadata(&headers))
        .await?;
    Ok(Json(receipt.into()))
}

/// Any route that does not exist
pub async fn not_found(
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> (StatusCode, Json<NotFoundResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            message: "Resource not found".to_string(),
            path: uri.to_string(),
            method: method.to_string(),
        }),
    )
}

/// GET /v1/health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.repository.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                service: "up",
                db: "ok",
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    service: "up",
                    db: "error",
                }),
            )
        }
    }
}

/// Request id set by the request-id layer, recorded on the revision
fn request_metadata(headers: &HeaderMap) -> RevisionMetadata {
    let metadata = RevisionMetadata::from_source(API_SOURCE);
    match headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(request_id) => metadata.with_request_id(request_id),
        None => metadata,
    }
}

/// Exact decimal from a JSON string or number, validated before the engine sees it
fn parse_amount(value: &serde_json::Value) -> Result<Decimal, ApiErrorResponse> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        // Number's Display is the literal as written, so no float rounding
        serde_json::Value::Number(n) => n.to_string(),
        _ => {
            return Err(ApiErrorResponse::invalid_amount(
                "amount must be a decimal string or number",
            ))
        }
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ApiErrorResponse::invalid_amount(format!("not a decimal amount: {}", text)))?;
    operations::validate_amount(amount)?;
    Ok(amount)
}
