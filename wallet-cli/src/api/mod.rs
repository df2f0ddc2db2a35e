//! HTTP API
//!
//! | Method | Path                     | Description                  |
//! |--------|--------------------------|------------------------------|
//! | GET    | `/v1/wallet/:id`         | Balance and version          |
//! | POST   | `/v1/wallet/:id/credit`  | Add funds, creating a wallet |
//! | POST   | `/v1/wallet/:id/debit`   | Remove funds                 |
//! | GET    | `/v1/health`             | Liveness plus store check    |
//!
//! Anything else is a JSON 404. Request bodies are capped at 100kb.

mod error;
mod handlers;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, Request};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use wallet_core::config::ServerConfig;
use wallet_core::ports::WalletRepository;
use wallet_core::services::WalletService;
use wallet_core::WalletContext;

/// Header carrying the request id, generated when the client sends none
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 100 * 1024;

/// Shared state for all handlers; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub wallet_service: WalletService,
    pub repository: Arc<dyn WalletRepository>,
}

impl AppState {
    pub fn from_context(ctx: &WalletContext) -> Self {
        Self {
            wallet_service: ctx.wallet_service.clone(),
            repository: Arc::clone(&ctx.repository),
        }
    }
}

/// Build the router with request ids, tracing, timeout and optional CORS
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(TimeoutLayer::new(server.request_timeout()));

    let v1 = Router::new()
        .route("/health", get(handlers::health))
        .route("/wallet/:id", get(handlers::get_wallet))
        .route("/wallet/:id/credit", post(handlers::credit))
        .route("/wallet/:id/debit", post(handlers::debit));

    let router = Router::new()
        .nest("/v1", v1)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    let router = match cors_layer(&server.cors_hosts) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.layer(middleware)
}

fn cors_layer(hosts: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = hosts
        .iter()
        .filter_map(|host| match HeaderValue::from_str(host) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(host = %host, "ignoring invalid CORS host");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::{header, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;
    use wallet_core::adapters::memory::InMemoryWalletRepository;
    use wallet_core::domain::{Wallet, WalletRevision};
    use wallet_core::ports::{StoreError, StoreResult};

    use super::*;

    fn app_with(repository: Arc<dyn WalletRepository>, server: &ServerConfig) -> Router {
        let state = AppState {
            wallet_service: WalletService::new(Arc::clone(&repository)),
            repository,
        };
        create_router(state, server)
    }

    fn app() -> Router {
        app_with(
            Arc::new(InMemoryWalletRepository::new()),
            &ServerConfig::default(),
        )
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(request.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Store that is down for everything
    struct DownRepository;

    #[async_trait]
    impl WalletRepository for DownRepository {
        async fn find_wallet(&self, _id: Uuid) -> StoreResult<Option<Wallet>> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn insert_revision(&self, _revision: &WalletRevision) -> StoreResult<()> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn ping(&self) -> StoreResult<()> {
            Err(StoreError::unavailable("connection refused"))
        }
    }

    /// Store that always reports a lost race on write
    struct ContendedRepository;

    #[async_trait]
    impl WalletRepository for ContendedRepository {
        async fn find_wallet(&self, _id: Uuid) -> StoreResult<Option<Wallet>> {
            Ok(None)
        }

        async fn insert_revision(&self, revision: &WalletRevision) -> StoreResult<()> {
            Err(StoreError::VersionConflict {
                wallet_id: revision.wallet_id,
                version: revision.version,
            })
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    /// Store whose reads never finish in time
    struct SlowRepository;

    #[async_trait]
    impl WalletRepository for SlowRepository {
        async fn find_wallet(&self, _id: Uuid) -> StoreResult<Option<Wallet>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn insert_revision(&self, _revision: &WalletRevision) -> StoreResult<()> {
            Ok(())
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unknown_wallet_reads_as_zero() {
        let app = app();
        let id = Uuid::new_v4();

        let response = send(&app, Method::GET, &format!("/v1/wallet/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = json_body(response).await;
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["balance"], "0.00");
        assert_eq!(body["version"], 0);
        assert!(body.get("updatedAt").is_none());
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let app = app();
        let id = Uuid::new_v4();

        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{id}/credit"),
            Some(json!({ "amount": "10.50" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["balance"], "10.50");
        assert_eq!(body["version"], 1);
        assert!(Uuid::parse_str(body["transactionId"].as_str().unwrap()).is_ok());

        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{id}/debit"),
            Some(json!({ "amount": 0.5 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let debit = json_body(response).await;
        assert_eq!(debit["balance"], "10.00");
        assert_eq!(debit["version"], 2);
        assert_ne!(debit["transactionId"], body["transactionId"]);

        let body = json_body(send(&app, Method::GET, &format!("/v1/wallet/{id}"), None).await).await;
        assert_eq!(body["balance"], "10.00");
        assert_eq!(body["version"], 2);
        assert!(body["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_debit_unknown_wallet_is_404() {
        let app = app();
        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{}/debit", Uuid::new_v4()),
            Some(json!({ "amount": "1" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "WALLET_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_400() {
        let app = app();
        let id = Uuid::new_v4();
        send(&app, Method::POST, &format!("/v1/wallet/{id}/credit"), Some(json!({ "amount": "5" }))).await;

        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{id}/debit"),
            Some(json!({ "amount": "5.01" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
        assert_eq!(body["details"]["available"], "5.00");
        assert_eq!(body["details"]["requested"], "5.01");
    }

    #[tokio::test]
    async fn test_invalid_amounts_are_400() {
        let app = app();
        let id = Uuid::new_v4();

        for amount in [json!("0"), json!(-3), json!("1.234"), json!("ten"), json!(null)] {
            let response = send(
                &app,
                Method::POST,
                &format!("/v1/wallet/{id}/credit"),
                Some(json!({ "amount": amount })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{amount}");
            assert_eq!(json_body(response).await["code"], "INVALID_AMOUNT");
        }
    }

    #[tokio::test]
    async fn test_malformed_requests_are_400() {
        let app = app();

        let response = send(&app, Method::GET, "/v1/wallet/not-a-uuid", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_REQUEST");

        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{}/credit", Uuid::new_v4()),
            Some(json!({ "value": "10" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_conflict_is_409() {
        let app = app_with(Arc::new(ContendedRepository), &ServerConfig::default());
        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{}/credit", Uuid::new_v4()),
            Some(json!({ "amount": "1" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], "CONCURRENT_MODIFICATION");
        assert_eq!(body["details"]["version"], 1);
    }

    #[tokio::test]
    async fn test_storage_fault_is_500() {
        let app = app_with(Arc::new(DownRepository), &ServerConfig::default());
        let response = send(&app, Method::GET, &format!("/v1/wallet/{}", Uuid::new_v4()), None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(&app(), Method::GET, "/v1/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "service": "up", "db": "ok" }));

        let down = app_with(Arc::new(DownRepository), &ServerConfig::default());
        let response = send(&down, Method::GET, "/v1/health", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "service": "up", "db": "error" }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out() {
        let server = ServerConfig {
            request_timeout_ms: 100,
            ..ServerConfig::default()
        };
        let app = app_with(Arc::new(SlowRepository), &server);

        let response = send(&app, Method::GET, &format!("/v1/wallet/{}", Uuid::new_v4()), None).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let request = Request::builder()
            .uri("/v1/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_cors_only_when_configured() {
        let request = || {
            Request::builder()
                .uri("/v1/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap()
        };

        let response = app().oneshot(request()).await.unwrap();
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

        let server = ServerConfig {
            cors_hosts: vec!["http://localhost:3000".to_string()],
            ..ServerConfig::default()
        };
        let app = app_with(Arc::new(InMemoryWalletRepository::new()), &server);
        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_request_id_is_recorded_on_revision() {
        let repo = Arc::new(InMemoryWalletRepository::new());
        let app = app_with(repo.clone(), &ServerConfig::default());
        let id = Uuid::new_v4();

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/v1/wallet/{id}/credit"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(REQUEST_ID_HEADER, "req-abc")
            .body(Body::from(json!({ "amount": "2" }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["requestId"], "req-abc");
        assert_eq!(body["balance"], "2.00");

        // Without a client id the generated one is used
        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{id}/debit"),
            Some(json!({ "amount": "1" })),
        )
        .await;
        let generated = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        let body = json_body(response).await;
        assert_eq!(body["requestId"], generated.as_str());

        let history = repo.revisions(id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].metadata.request_id.as_deref(), Some("req-abc"));
        assert_eq!(history[0].metadata.source.as_deref(), Some("api"));
        assert_eq!(body["transactionId"], history[1].transaction_id.to_string());
        assert_eq!(history[1].metadata.request_id.as_deref(), Some(generated.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = app();

        for (method, uri) in [
            (Method::GET, "/nope"),
            (Method::GET, "/wallet/00000000-0000-0000-0000-000000000000"),
            (Method::POST, "/v1/unknown?x=1"),
        ] {
            let response = send(&app, method.clone(), uri, None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(response.headers().contains_key(REQUEST_ID_HEADER));
            assert_eq!(
                json_body(response).await,
                json!({ "message": "Resource not found", "path": uri, "method": method.as_str() })
            );
        }
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = app();
        let id = Uuid::new_v4();
        let padding = "x".repeat(MAX_BODY_BYTES);

        let response = send(
            &app,
            Method::POST,
            &format!("/v1/wallet/{id}/credit"),
            Some(json!({ "amount": "1", "note": padding })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["code"], "PAYLOAD_TOO_LARGE");

        let body = json_body(send(&app, Method::GET, &format!("/v1/wallet/{id}"), None).await).await;
        assert_eq!(body["version"], 0);
    }
}
