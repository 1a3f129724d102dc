//! HTTP API for bracket management.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                              - Health check
//! POST   /api/v1/tournaments/{t}/categories/{c}/bracket       - Create/generate bracket
//! GET    /api/v1/tournaments/{t}/brackets                     - List brackets
//! GET    /api/v1/brackets/{id}                                - Bracket view
//! DELETE /api/v1/brackets/{id}                                - Delete draft bracket
//! POST   /api/v1/brackets/{id}/publish                        - Publish
//! POST   /api/v1/brackets/{id}/unpublish                      - Unpublish
//! POST   /api/v1/brackets/{id}/withdrawals                    - Withdraw team
//! GET    /api/v1/brackets/{id}/standings                      - Stored standings
//! POST   /api/v1/brackets/{id}/standings                      - Recalculate standings
//! POST   /api/v1/brackets/{id}/groups                         - Assign groups
//! POST   /api/v1/brackets/{id}/groups/swap                    - Swap two teams
//! POST   /api/v1/brackets/{id}/knockout                       - Knockout from groups
//! DELETE /api/v1/brackets/{id}/knockout                       - Delete knockout phase
//! POST   /api/v1/matches/{id}/score                           - Organizer score
//! DELETE /api/v1/matches/{id}/score                           - Delete score
//! POST   /api/v1/matches/{id}/player-score                    - Player score (x-caller-team-id)
//! POST   /api/v1/matches/{id}/schedule                        - Court/time
//! POST   /api/v1/matches/{id}/status                          - Status transition
//! POST   /api/v1/matches/{id}/advance                         - Advance winner
//! POST   /api/v1/matches/{id}/retract                         - Retract advancement
//! POST   /api/v1/matches/{id}/forfeit                         - Declare forfeit
//! ```
//!
//! Failures return `{"error": "..."}` with 400 (validation), 409 (state),
//! 404 (unknown id), 403 (not a participant) or 500.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod errors;
pub mod groups;
pub mod matches;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use racket_draw::{BracketManager, db::Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; both fields are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BracketManager>,
    /// Pool handle for health checks, `None` with in-memory storage
    pub database: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(manager: BracketManager, database: Option<Database>) -> Self {
        Self {
            manager: Arc::new(manager),
            database: database.map(Arc::new),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use racket_draw::{BracketManager, db::InMemoryRepository};
/// use rd_server::api::{AppState, create_router};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = BracketManager::new(Arc::new(InMemoryRepository::new()));
/// let app = create_router(AppState::new(manager, None));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let organizer_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/categories/{category_id}/bracket",
            post(brackets::create_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/brackets",
            get(brackets::list_brackets),
        )
        .route(
            "/brackets/{bracket_id}",
            get(brackets::get_bracket).delete(brackets::delete_bracket),
        )
        .route("/brackets/{bracket_id}/publish", post(brackets::publish))
        .route("/brackets/{bracket_id}/unpublish", post(brackets::unpublish))
        .route(
            "/brackets/{bracket_id}/withdrawals",
            post(brackets::withdraw_team),
        )
        .route(
            "/brackets/{bracket_id}/standings",
            get(brackets::get_standings).post(brackets::calculate_standings),
        )
        .route("/brackets/{bracket_id}/groups", post(groups::assign_groups))
        .route("/brackets/{bracket_id}/groups/swap", post(groups::swap_teams))
        .route(
            "/brackets/{bracket_id}/knockout",
            post(groups::generate_knockout).delete(groups::delete_knockout),
        )
        .route(
            "/matches/{match_id}/score",
            post(matches::submit_score).delete(matches::delete_score),
        )
        .route("/matches/{match_id}/schedule", post(matches::schedule_match))
        .route("/matches/{match_id}/status", post(matches::set_status))
        .route("/matches/{match_id}/advance", post(matches::advance))
        .route(
            "/matches/{match_id}/retract",
            post(matches::retract_advancement),
        )
        .route("/matches/{match_id}/forfeit", post(matches::forfeit));

    // Player self-report needs the caller team injected
    let player_routes = Router::new()
        .route(
            "/matches/{match_id}/player-score",
            post(matches::submit_player_score),
        )
        .layer(axum::middleware::from_fn(middleware::caller_team_middleware));

    Router::new().merge(organizer_routes).merge(player_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":"postgres","database":true,"timestamp":"2026-03-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, db_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if db_healthy { "healthy" } else { "unhealthy" },
            "storage": storage,
            "database": db_healthy,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
