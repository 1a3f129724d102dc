//! Match endpoints: scores, scheduling, status and advancement.
//!
//! Every mutation is serialized per bracket by the manager; these handlers
//! only translate requests and record metrics.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use racket_draw::{
    AdvanceOutcome, DrawError, ErrorKind, Match, MatchStatus, SetScore, Side,
    matches::ScheduleUpdate,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AppState,
    errors::{ApiResult, error_response},
    middleware::CallerTeam,
};
use crate::{logging, metrics};

/// Set-by-set score, team1 games first
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub sets: Vec<SetScore>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: MatchStatus,
}

#[derive(Debug, Deserialize)]
pub struct ForfeitRequest {
    /// Side declared winner
    pub winner: Side,
}

/// Matches resolved by a forfeit, the forfeited match first
#[derive(Debug, Serialize)]
pub struct ForfeitResponse {
    pub matches: Vec<Match>,
}

fn record_rejection(err: &DrawError) {
    let reason = match err.kind() {
        ErrorKind::Validation => "validation",
        ErrorKind::State => "state",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Unauthorized => "unauthorized",
        ErrorKind::Internal => "internal",
    };
    metrics::scores_rejected_total(reason);
}

/// Organizer score submission.
///
/// # Responses
///
/// - `200 OK`: the completed match
/// - `400 Bad Request`: illegal set score or undecided match
/// - `409 Conflict`: match already finished or teams not yet known
pub async fn submit_score(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<Match>> {
    match state.manager.submit_score(match_id, &request.sets).await {
        Ok(stored) => {
            metrics::scores_submitted_total("organizer");
            Ok(Json(stored))
        }
        Err(e) => {
            record_rejection(&e);
            Err(error_response(e))
        }
    }
}

/// Score reported by one of the playing teams.
///
/// Requires the `x-caller-team-id` header; a team that does not play the
/// match gets `403 Forbidden`.
pub async fn submit_player_score(
    State(state): State<AppState>,
    Extension(CallerTeam(caller)): Extension<CallerTeam>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<Match>> {
    match state
        .manager
        .submit_player_score(match_id, caller, &request.sets)
        .await
    {
        Ok(stored) => {
            metrics::scores_submitted_total("player");
            Ok(Json(stored))
        }
        Err(e) => {
            record_rejection(&e);
            Err(error_response(e))
        }
    }
}

/// Reset a finished match to pending
pub async fn delete_score(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Json<Match>> {
    let reset = state
        .manager
        .delete_score(match_id)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event(
        "score_deleted",
        reset.bracket_id,
        &format!("Score of match {match_id} deleted"),
    );
    Ok(Json(reset))
}

pub async fn schedule_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(update): Json<ScheduleUpdate>,
) -> ApiResult<Json<Match>> {
    state
        .manager
        .schedule_match(match_id, update)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<Match>> {
    state
        .manager
        .set_match_status(match_id, request.status)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Move the winner into the next match.
///
/// Advancing the final reports the champion instead.
pub async fn advance(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Json<AdvanceOutcome>> {
    let outcome = state
        .manager
        .advance(match_id)
        .await
        .map_err(error_response)?;

    metrics::advancements_total();
    match &outcome {
        AdvanceOutcome::Advanced { next, cascaded } => {
            if !cascaded.is_empty() {
                metrics::forfeits_total(cascaded.len() as u64);
            }
            tracing::debug!(match_id = %match_id, next = %next.id, "Winner advanced");
        }
        AdvanceOutcome::TournamentComplete { champion } => {
            tracing::info!(match_id = %match_id, champion = %champion, "Final decided");
        }
    }

    Ok(Json(outcome))
}

/// Undo an advancement while the next match has not started
pub async fn retract_advancement(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> ApiResult<Json<Match>> {
    state
        .manager
        .retract_advancement(match_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Organizer-declared forfeit, advancing the named winner
pub async fn forfeit(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<ForfeitRequest>,
) -> ApiResult<Json<ForfeitResponse>> {
    let matches = state
        .manager
        .forfeit(match_id, request.winner)
        .await
        .map_err(error_response)?;

    metrics::forfeits_total(matches.len() as u64);
    Ok(Json(ForfeitResponse { matches }))
}
