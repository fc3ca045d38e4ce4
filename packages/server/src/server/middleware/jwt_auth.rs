//! Bearer-token authentication.
//!
//! Listing reads are public, so a missing or bad token never rejects the
//! request here. Handlers that need an identity (manual listing updates)
//! look for the `AuthUser` extension and answer 401 themselves.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::AUTHORIZATION, HeaderMap, Request};
use axum::{middleware::Next, response::Response};
use tracing::debug;

use crate::domains::auth::JwtService;

/// Caller identity taken from a verified token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(user) = authenticate(request.headers(), &jwt_service) {
        debug!(user_id = %user.user_id, "Authenticated listing API caller");
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

fn authenticate(headers: &HeaderMap, jwt_service: &JwtService) -> Option<AuthUser> {
    let token = bearer_token(headers)?;
    match jwt_service.verify_token(token) {
        Ok(claims) => Some(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        }),
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            None
        }
    }
}

/// Token from `Authorization: Bearer <token>`. The scheme is
/// case-insensitive; any other scheme, or a bare token, yields `None`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
