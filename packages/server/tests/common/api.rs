//! HTTP client for integration testing.
//!
//! Drives the axum router in-process with `oneshot`, no socket or rate limiter.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use listings_core::domains::auth::JwtService;
use listings_core::domains::listings::ListingStores;
use listings_core::kernel::MockListingWriter;
use listings_core::server::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test_secret_key";
pub const TEST_JWT_ISSUER: &str = "test_issuer";

/// Router over in-memory stores with a recording upstream writer.
pub struct TestApi {
    pub stores: ListingStores,
    pub writer: MockListingWriter,
    pub jwt_service: Arc<JwtService>,
    router: Router,
}

/// Status plus parsed JSON body (`Value::Null` for empty bodies).
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApi {
    pub fn new() -> Self {
        Self::with_writer(MockListingWriter::new())
    }

    pub fn with_writer(writer: MockListingWriter) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let stores = ListingStores::memory();
        let jwt_service = Arc::new(JwtService::new(
            TEST_JWT_SECRET,
            TEST_JWT_ISSUER.to_string(),
        ));
        let state = AppState::new(
            stores.clone(),
            jwt_service.clone(),
            Some(Arc::new(writer.clone())),
        );

        Self {
            stores,
            writer,
            jwt_service,
            router: build_router(state),
        }
    }

    /// Valid bearer token for the test issuer.
    pub fn token(&self) -> String {
        self.jwt_service
            .create_token("test-agent", Some("agent@example.com".to_string()))
            .expect("create test token")
    }

    pub async fn get(&self, uri: &str) -> ApiResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.send(request).await
    }

    pub async fn patch(&self, uri: &str, body: &Value, token: Option<&str>) -> ApiResponse {
        let mut builder = Request::builder()
            .method(Method::PATCH)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> ApiResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        ApiResponse { status, body }
    }

    /// Wait until the background forwarder has sent `count` updates.
    pub async fn wait_for_forwards(&self, count: usize) -> Vec<(String, Value)> {
        for _ in 0..50 {
            let updates = self.writer.updates();
            if updates.len() >= count {
                return updates;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.writer.updates()
    }
}

impl ApiResponse {
    /// Listing keys of a list response, in response order.
    pub fn keys(&self) -> Vec<String> {
        self.body["properties"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["ListingKey"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
