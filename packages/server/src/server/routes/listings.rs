//! REST handlers for `/api/properties`.

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::common::pagination::{
    PageRequest, PageResponse, MULTI_STORE_DEFAULT_LIMIT, SINGLE_STORE_DEFAULT_LIMIT,
};
use crate::domains::listings::{Listing, ListingFilter, ListingQuery, ListingTier, SortBy};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_tier(raw: &str) -> Result<ListingTier, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::UnknownTier(raw.to_string()))
}

/// `GET /api/properties` - IDX, VOW and Sold merged and deduplicated.
pub async fn list_all_properties(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<PageResponse<Listing>> {
    let page = PageRequest::from_raw(
        query.page.as_deref(),
        query.limit.as_deref(),
        MULTI_STORE_DEFAULT_LIMIT,
    );
    let filter = ListingFilter::from_query(&query, Utc::now());
    let sort = SortBy::resolve(query.sort_by.as_deref()).order();

    let result = state.aggregator.query(&filter, sort, &page).await?;
    Ok(Json(PageResponse::new(&page, result.total, result.listings)))
}

/// `GET /api/properties/:tier`
pub async fn list_tier_properties(
    Extension(state): Extension<AppState>,
    Path(tier): Path<String>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<PageResponse<Listing>> {
    let tier = parse_tier(&tier)?;
    let page = PageRequest::from_raw(
        query.page.as_deref(),
        query.limit.as_deref(),
        SINGLE_STORE_DEFAULT_LIMIT,
    );
    let filter = ListingFilter::from_query(&query, Utc::now());
    let sort = SortBy::resolve(query.sort_by.as_deref()).order();

    let store = state.stores.get(tier);
    let (listings, total) = futures::try_join!(
        store.query(&filter, sort, page.start_index(), page.limit()),
        store.count(&filter),
    )?;

    tracing::debug!(%tier, returned = listings.len(), total, "Listed tier properties");
    Ok(Json(PageResponse::new(&page, total, listings)))
}

/// `GET /api/properties/:tier/:listing_key`
pub async fn get_property(
    Extension(state): Extension<AppState>,
    Path((tier, listing_key)): Path<(String, String)>,
) -> ApiResult<Listing> {
    let tier = parse_tier(&tier)?;
    state
        .stores
        .get(tier)
        .find_by_key(&listing_key)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `PATCH /api/properties/:tier/:listing_key`
///
/// Shallow-merges the body into the stored details and responds with the
/// updated listing. The same body is then forwarded upstream in the
/// background; a failed forward is logged and never rolls back the local write.
pub async fn update_property(
    Extension(state): Extension<AppState>,
    auth_user: Option<Extension<AuthUser>>,
    Path((tier, listing_key)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<Listing> {
    let Some(Extension(user)) = auth_user else {
        return Err(ApiError::Unauthorized);
    };
    let tier = parse_tier(&tier)?;
    let Value::Object(patch) = &body else {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let updated = state
        .stores
        .get(tier)
        .merge_details(&listing_key, patch)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(
        %tier,
        listing_key = %listing_key,
        user_id = %user.user_id,
        fields = patch.len(),
        "Listing updated"
    );

    if let Some(writer) = state.upstream_writer.clone() {
        tokio::spawn(async move {
            if let Err(e) = writer.forward_update(&listing_key, &body).await {
                tracing::warn!(listing_key = %listing_key, error = %format!("{e:#}"), "Upstream forward failed");
            }
        });
    }

    Ok(Json(updated))
}
