//! Group stage endpoints and the hand-off to the knockout phase.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use racket_draw::{GroupAssignment, Match, bracket::BracketId, bracket::GeneratedBracket};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AppState,
    errors::{ApiResult, error_response},
};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct AssignGroupsRequest {
    pub groups: Vec<GroupAssignment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTeamsRequest {
    pub team_a: Uuid,
    pub team_b: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteKnockoutResponse {
    pub deleted_matches: usize,
}

/// Replace the group assignment and regenerate every round robin
pub async fn assign_groups(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
    Json(request): Json<AssignGroupsRequest>,
) -> ApiResult<Json<Vec<Match>>> {
    let matches = state
        .manager
        .assign_groups(bracket_id, &request.groups)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event(
        "groups_assigned",
        bracket_id,
        &format!(
            "{} group(s), {} match(es)",
            request.groups.len(),
            matches.len()
        ),
    );
    Ok(Json(matches))
}

/// Exchange two teams between groups.
///
/// Returns the regenerated matches of both affected groups.
pub async fn swap_teams(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
    Json(request): Json<SwapTeamsRequest>,
) -> ApiResult<Json<Vec<Match>>> {
    let matches = state
        .manager
        .swap_teams(bracket_id, request.team_a, request.team_b)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event(
        "teams_swapped",
        bracket_id,
        &format!("Swapped {} and {}", request.team_a, request.team_b),
    );
    Ok(Json(matches))
}

/// Seed a knockout phase from the final group standings.
///
/// `409 Conflict` while any group match is unfinished.
pub async fn generate_knockout(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<(StatusCode, Json<GeneratedBracket>)> {
    let generated = state
        .manager
        .generate_knockout(bracket_id)
        .await
        .map_err(error_response)?;

    metrics::brackets_generated_total("knockout_phase");
    logging::log_bracket_event(
        "knockout_generated",
        bracket_id,
        &format!(
            "{} round(s), {} match(es)",
            generated.rounds.len(),
            generated.matches.len()
        ),
    );
    Ok((StatusCode::CREATED, Json(generated)))
}

pub async fn delete_knockout(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<DeleteKnockoutResponse>> {
    let deleted_matches = state
        .manager
        .delete_knockout(bracket_id)
        .await
        .map_err(error_response)?;

    logging::log_bracket_event(
        "knockout_deleted",
        bracket_id,
        &format!("{deleted_matches} knockout match(es) removed"),
    );
    Ok(Json(DeleteKnockoutResponse { deleted_matches }))
}
