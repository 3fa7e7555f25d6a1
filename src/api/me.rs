//! Current-user endpoints backed by the user service
//!
//! The auth gateway has already verified the bearer token and stamped the
//! subject into `X-User-Id` before these handlers run, so the header is
//! trusted here. The two endpoints deliberately differ in how they treat an
//! unreachable user service: the profile is load-bearing and propagates the
//! failure as 503, while the friends list degrades to an empty list.

use crate::domain::{UserProfile, UserSummary};
use crate::error::{AppError, Result};
use crate::middleware::USER_ID_HEADER;
use crate::server::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use tracing::warn;

/// Read the gateway-verified subject from the request headers.
fn authenticated_user_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| AppError::Unauthorized("Missing authenticated user context".to_string()))
}

/// Full profile of the authenticated user.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Me",
    responses(
        (status = 200, description = "Authenticated user's profile", body = UserProfile),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "User service unavailable")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>> {
    let user_id = authenticated_user_id(&headers)?;
    let profile = state.user_client.get_user_full(&user_id).await?;
    Ok(Json(profile))
}

/// Friends of the authenticated user.
///
/// Serves an empty list when the user service is unreachable; the page this
/// feeds renders fine without friends, so a degraded answer beats a 503.
#[utoipa::path(
    get,
    path = "/api/v1/me/friends",
    tag = "Me",
    responses(
        (status = 200, description = "Authenticated user's friends", body = [UserSummary]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_friends(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserSummary>>> {
    let user_id = authenticated_user_id(&headers)?;
    match state.user_client.get_user_friends(&user_id).await {
        Ok(friends) => Ok(Json(friends)),
        Err(AppError::UpstreamUnavailable { operation, source }) => {
            warn!(
                operation,
                user_id,
                cause = format!("{source:#}"),
                "serving empty friends list while user service is unavailable"
            );
            Ok(Json(Vec::new()))
        }
        Err(err) => Err(err),
    }
}
