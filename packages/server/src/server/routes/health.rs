use axum::{extract::Extension, http::StatusCode, Json};
use futures::future::join_all;
use serde::Serialize;

use crate::domains::listings::ListingTier;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    stores: Vec<StoreHealth>,
}

#[derive(Serialize)]
pub struct StoreHealth {
    tier: ListingTier,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Pings every tier store with a 5s timeout. Returns 200 OK if all stores
/// respond, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let checks = ListingTier::ALL.into_iter().map(|tier| {
        let store = state.stores.get(tier);
        async move {
            let (status, error) = match tokio::time::timeout(
                std::time::Duration::from_secs(5),
                store.ping(),
            )
            .await
            {
                Ok(Ok(())) => ("ok", None),
                Ok(Err(e)) => ("error", Some(format!("Query failed: {}", e))),
                Err(_) => ("error", Some("Query timeout (>5s)".to_string())),
            };
            StoreHealth {
                tier,
                status: status.to_string(),
                error,
            }
        }
    });
    let stores = join_all(checks).await;

    let is_healthy = stores.iter().all(|s| s.error.is_none());
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            stores,
        }),
    )
}
