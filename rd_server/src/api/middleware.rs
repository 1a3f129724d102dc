//! Caller identity middleware for player-facing endpoints.
//!
//! Authentication happens upstream; by the time a request reaches this
//! server the gateway has put the caller's team id in `x-caller-team-id`.
//! The middleware parses it and injects a [`CallerTeam`] into request
//! extensions for downstream handlers.
//!
//! ```rust,no_run
//! use axum::{Router, routing::post, middleware};
//! use rd_server::api::middleware::caller_team_middleware;
//! # async fn handler() {}
//!
//! let player_routes: Router = Router::new()
//!     .route("/matches/{match_id}/player-score", post(handler))
//!     .layer(middleware::from_fn(caller_team_middleware));
//! # let _ = player_routes;
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the verified caller team
pub const CALLER_TEAM_HEADER: &str = "x-caller-team-id";

/// Team on whose behalf the request is made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerTeam(pub Uuid);

fn caller_team(headers: &HeaderMap) -> Result<CallerTeam, StatusCode> {
    let raw = headers
        .get(CALLER_TEAM_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Uuid::parse_str(raw.trim())
        .map(CallerTeam)
        .map_err(|_| StatusCode::BAD_REQUEST)
}

/// Rejects requests without a caller team.
///
/// - **Missing header**: `401 Unauthorized`
/// - **Not a UUID**: `400 Bad Request`
pub async fn caller_team_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let caller = caller_team(request.headers())?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
