//! Bracket endpoints: creation, lifecycle, withdrawals and standings.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use racket_draw::{
    Bracket, BracketView, CreateBracketRequest, Match, Standing, bracket::BracketId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AppState,
    errors::{ApiResult, error_response},
    request_id::RequestId,
};
use crate::{logging, metrics};

/// Body of `POST /brackets/{id}/withdrawals`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub team_id: Uuid,
}

/// Matches resolved by a withdrawal
#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub team_id: Uuid,
    pub forfeited: Vec<Match>,
}

/// Create (or regenerate a draft) bracket for a tournament category.
///
/// # Responses
///
/// - `201 Created`: the new bracket with its matches
/// - `400 Bad Request`: empty or duplicate team list, bad configuration block
/// - `409 Conflict`: a non-draft bracket already exists for the category
pub async fn create_bracket(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((tournament_id, category_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CreateBracketRequest>,
) -> ApiResult<(StatusCode, Json<BracketView>)> {
    let started = Instant::now();
    let format = request.format;
    let team_count = request.team_ids.len();

    let view = state
        .manager
        .create_bracket(tournament_id, category_id, request)
        .await
        .map_err(error_response)?;

    metrics::brackets_generated_total(&format.to_string());
    logging::log_timing("create_bracket", started.elapsed(), Some(request_id.as_str()));
    logging::log_bracket_event(
        "created",
        view.bracket.id,
        &format!(
            "{format} bracket with {team_count} teams and {} matches",
            view.matches.len()
        ),
    );

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_brackets(
    State(state): State<AppState>,
    Path(tournament_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Bracket>>> {
    state
        .manager
        .list_brackets(tournament_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Bracket with its matches and stored standings
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<BracketView>> {
    state
        .manager
        .get_bracket_view(bracket_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Delete a draft bracket. Returns `204 No Content`.
pub async fn delete_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .delete_bracket(bracket_id)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event("deleted", bracket_id, "Draft bracket deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<Bracket>> {
    let bracket = state
        .manager
        .publish(bracket_id)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event("published", bracket_id, "Bracket published");
    Ok(Json(bracket))
}

pub async fn unpublish(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<Bracket>> {
    let bracket = state
        .manager
        .unpublish(bracket_id)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event("unpublished", bracket_id, "Bracket back in progress");
    Ok(Json(bracket))
}

/// Withdraw a team, forfeiting its remaining matches.
pub async fn withdraw_team(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
    Json(request): Json<WithdrawRequest>,
) -> ApiResult<Json<WithdrawResponse>> {
    let forfeited = state
        .manager
        .withdraw_team(bracket_id, request.team_id)
        .await
        .map_err(error_response)?;

    metrics::withdrawals_total();
    metrics::forfeits_total(forfeited.len() as u64);
    logging::log_bracket_event(
        "team_withdrawn",
        bracket_id,
        &format!(
            "Team {} withdrawn, {} match(es) forfeited",
            request.team_id,
            forfeited.len()
        ),
    );

    Ok(Json(WithdrawResponse {
        team_id: request.team_id,
        forfeited,
    }))
}

pub async fn get_standings(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<Vec<Standing>>> {
    state
        .manager
        .get_standings(bracket_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Recompute and store standings from the current match results
pub async fn calculate_standings(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<Vec<Standing>>> {
    let started = Instant::now();
    let standings = state
        .manager
        .calculate_standings(bracket_id)
        .await
        .map_err(error_response)?;

    logging::log_timing("calculate_standings", started.elapsed(), None);
    Ok(Json(standings))
}
