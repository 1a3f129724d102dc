//! Match progression: scores, forfeits, withdrawals and winner advancement.
//!
//! The engine is stateless apart from its repository handle. Callers are
//! expected to serialize operations per bracket; every write still goes
//! through the versioned [`BracketRepository::update_match`], so a stale
//! read surfaces as `DrawError::Conflict` instead of overwriting.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::models::{Match, MatchStatus, ScheduleUpdate, SetScore, Side};
use super::score;
use crate::bracket::models::{Bracket, BracketId, MatchId, TeamId};
use crate::db::BracketRepository;
use crate::errors::{DrawError, DrawResult};

/// Result of advancing a finished match
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Winner placed into the successor match
    Advanced {
        /// Successor after placement
        next: Match,
        /// Later matches resolved as forfeits against withdrawn teams
        cascaded: Vec<Match>,
    },
    /// The advanced match was the final
    TournamentComplete { champion: TeamId },
}

/// Drives matches through their lifecycle
#[derive(Clone)]
pub struct ProgressionEngine {
    repo: Arc<dyn BracketRepository>,
}

impl ProgressionEngine {
    pub fn new(repo: Arc<dyn BracketRepository>) -> Self {
        Self { repo }
    }

    pub async fn load_match(&self, match_id: MatchId) -> DrawResult<Match> {
        self.repo
            .get_match(match_id)
            .await?
            .ok_or(DrawError::MatchNotFound(match_id))
    }

    async fn load_bracket(&self, bracket_id: BracketId) -> DrawResult<Bracket> {
        self.repo
            .get_bracket(bracket_id)
            .await?
            .ok_or(DrawError::BracketNotFound(bracket_id))
    }

    /// Update court/time metadata. A pending match with a time becomes
    /// `scheduled`.
    ///
    /// # Errors
    ///
    /// * `DrawError::State` - Match already finished
    pub async fn schedule(&self, match_id: MatchId, update: ScheduleUpdate) -> DrawResult<Match> {
        let mut m = self.load_match(match_id).await?;
        ensure_open(&m)?;

        if let Some(court) = update.court {
            m.court = Some(court);
        }
        if let Some(at) = update.scheduled_at {
            m.scheduled_at = Some(at);
        }
        if m.status == MatchStatus::Pending && m.scheduled_at.is_some() {
            m.status = MatchStatus::Scheduled;
        }

        let stored = self.repo.update_match(&m).await?;
        log::debug!("Scheduled match {} ({:?})", stored.id, stored.scheduled_at);
        Ok(stored)
    }

    /// Explicit administrative status change.
    ///
    /// Setting the current status again is a no-op. Results are never set
    /// here; see [`MatchStatus::can_transition_to`].
    pub async fn set_status(&self, match_id: MatchId, status: MatchStatus) -> DrawResult<Match> {
        let mut m = self.load_match(match_id).await?;
        if m.status == status {
            return Ok(m);
        }

        if !m.status.can_transition_to(status) {
            return Err(DrawError::state(format!(
                "Cannot move match {} from {} to {}",
                m.id, m.status, status
            )));
        }
        if status == MatchStatus::InProgress && !m.is_ready() {
            return Err(DrawError::state(format!(
                "Match {} cannot start before both teams are known",
                m.id
            )));
        }

        m.status = status;
        let stored = self.repo.update_match(&m).await?;
        log::debug!("Match {} is now {}", stored.id, stored.status);
        Ok(stored)
    }

    /// Record an organizer-submitted score and complete the match.
    ///
    /// The winner is not advanced; see [`ProgressionEngine::advance`].
    ///
    /// # Errors
    ///
    /// * `DrawError::Score` - Score rejected by the validator
    /// * `DrawError::State` - Match finished or a slot still unresolved
    pub async fn submit_score(&self, match_id: MatchId, sets: &[SetScore]) -> DrawResult<Match> {
        let m = self.load_match(match_id).await?;
        self.record_score(m, sets).await
    }

    /// Same as [`ProgressionEngine::submit_score`], restricted to the teams
    /// playing the match.
    ///
    /// # Errors
    ///
    /// * `DrawError::NotParticipant` - `caller` does not play this match
    pub async fn submit_player_score(
        &self,
        match_id: MatchId,
        caller: TeamId,
        sets: &[SetScore],
    ) -> DrawResult<Match> {
        let m = self.load_match(match_id).await?;
        if !m.has_team(caller) {
            log::warn!("Team {} tried to report match {}", caller, m.id);
            return Err(DrawError::NotParticipant {
                team: caller,
                match_id: m.id,
            });
        }
        self.record_score(m, sets).await
    }

    async fn record_score(&self, mut m: Match, sets: &[SetScore]) -> DrawResult<Match> {
        ensure_open(&m)?;
        if !m.is_ready() {
            return Err(DrawError::state(format!(
                "Match {} cannot be scored before both teams are known",
                m.id
            )));
        }

        let bracket = self.load_bracket(m.bracket_id).await?;
        let validated = score::validate(sets, bracket.config.match_format)?;

        m.sets = validated.sets;
        m.winner = Some(validated.winner);
        m.status = MatchStatus::Completed;

        let stored = self.repo.update_match(&m).await?;
        log::info!(
            "Match {} completed {}-{} in sets, winner {}",
            stored.id,
            validated.team1_sets,
            validated.team2_sets,
            validated.winner
        );
        Ok(stored)
    }

    /// Move the winner of a finished knockout match into its successor.
    ///
    /// The successor is never completed by this, except when the other slot
    /// holds a withdrawn team: that match is then resolved as a forfeit and
    /// advanced in turn.
    ///
    /// # Errors
    ///
    /// * `DrawError::State` - Match unfinished, a group match, or already advanced
    /// * `DrawError::Validation` - Finished without a winner
    pub async fn advance(&self, match_id: MatchId) -> DrawResult<AdvanceOutcome> {
        let m = self.load_match(match_id).await?;

        if !m.is_finished() {
            return Err(DrawError::state(format!("Match {} is not finished", m.id)));
        }
        let Some(winner) = m.winner_team() else {
            return Err(DrawError::validation(format!(
                "Match {} is finished but has no winner",
                m.id
            )));
        };
        if m.is_group_match() {
            return Err(DrawError::state("Group matches do not advance"));
        }

        if m.next_match_id.is_none() {
            log::info!("Bracket {} complete, champion {}", m.bracket_id, winner);
            return Ok(AdvanceOutcome::TournamentComplete { champion: winner });
        }

        let bracket = self.load_bracket(m.bracket_id).await?;
        let mut touched = self.propagate(&bracket, m).await?;
        let next = touched.remove(0);
        Ok(AdvanceOutcome::Advanced {
            next,
            cascaded: touched,
        })
    }

    /// Place the winner of `finished` and follow any forfeits it triggers.
    ///
    /// Returns every match written, successor first.
    async fn propagate(&self, bracket: &Bracket, finished: Match) -> DrawResult<Vec<Match>> {
        let mut touched = Vec::new();
        let mut current = finished;

        while let Some(next_id) = current.next_match_id {
            let winner = current.winner_team().ok_or_else(|| {
                DrawError::validation(format!("Match {} has no winner", current.id))
            })?;
            let slot = current
                .next_match_slot
                .unwrap_or_else(|| Side::for_pairing(current.slot));

            let mut next = self.load_match(next_id).await?;
            match next.team(slot) {
                Some(team) if team == winner => {
                    return Err(DrawError::state(format!(
                        "Winner of match {} has already been advanced",
                        current.id
                    )));
                }
                Some(other) => {
                    return Err(DrawError::state(format!(
                        "Slot {} of match {} is already taken by {}",
                        slot, next.id, other
                    )));
                }
                None => {}
            }
            if next.is_finished() {
                return Err(DrawError::state(format!(
                    "Match {} is already finished",
                    next.id
                )));
            }

            next.set_team(slot, Some(winner));
            let next = self.repo.update_match(&next).await?;
            log::info!("Advanced {} from match {} into match {}", winner, current.id, next.id);

            let Some(forfeiting) = withdrawn_side(bracket, &next) else {
                touched.push(next);
                break;
            };
            let resolved = self.record_forfeit(next, forfeiting.opposite()).await?;
            touched.push(resolved.clone());
            current = resolved;
        }

        Ok(touched)
    }

    async fn record_forfeit(&self, mut m: Match, winner: Side) -> DrawResult<Match> {
        m.status = MatchStatus::Forfeit;
        m.winner = Some(winner);
        m.sets.clear();

        let stored = self.repo.update_match(&m).await?;
        log::info!(
            "Match {} forfeited, {} wins",
            stored.id,
            stored.winner_team().map(|t| t.to_string()).unwrap_or_default()
        );
        Ok(stored)
    }

    /// Organizer-declared forfeit: `winner` takes the match and advances.
    ///
    /// Returns the forfeited match followed by every match written while
    /// advancing.
    pub async fn forfeit(&self, match_id: MatchId, winner: Side) -> DrawResult<Vec<Match>> {
        let m = self.load_match(match_id).await?;
        ensure_open(&m)?;
        if !m.is_ready() {
            return Err(DrawError::state(format!(
                "Match {} cannot be forfeited before both teams are known",
                m.id
            )));
        }

        let bracket = self.load_bracket(m.bracket_id).await?;
        let resolved = self.record_forfeit(m, winner).await?;
        let mut touched = vec![resolved.clone()];
        touched.extend(self.propagate(&bracket, resolved).await?);
        Ok(touched)
    }

    /// Withdraw `team` from the bracket.
    ///
    /// Every unfinished match of the team whose opponent is known is
    /// forfeited to that opponent, who is then advanced. Matches whose
    /// opponent slot is still open are resolved when someone is advanced
    /// into them. Finished matches keep their result.
    ///
    /// # Errors
    ///
    /// * `DrawError::TeamNotFound` - Team plays no match in this bracket
    /// * `DrawError::State` - Team already withdrawn
    pub async fn withdraw_team(&self, bracket_id: BracketId, team: TeamId) -> DrawResult<Vec<Match>> {
        let mut bracket = self.load_bracket(bracket_id).await?;
        if bracket.is_withdrawn(team) {
            return Err(DrawError::state(format!("Team {team} is already withdrawn")));
        }

        let matches = self.repo.list_matches(bracket_id).await?;
        if !matches.iter().any(|m| m.has_team(team)) {
            return Err(DrawError::TeamNotFound(team));
        }

        bracket.withdrawn_teams.push(team);
        bracket.updated_at = Utc::now();
        self.repo.upsert_bracket(&bracket).await?;
        log::info!("Team {} withdrawn from bracket {}", team, bracket_id);

        let open: Vec<MatchId> = matches
            .iter()
            .filter(|m| m.has_team(team) && !m.is_finished())
            .map(|m| m.id)
            .collect();

        let mut touched = Vec::new();
        for id in open {
            // Reload: an earlier cascade may have written this match.
            let m = self.load_match(id).await?;
            if m.is_finished() {
                continue;
            }
            let Some(side) = m.side_of(team) else {
                continue;
            };
            if m.team(side.opposite()).is_none() {
                log::debug!("Match {} waits for an opponent before forfeiting", m.id);
                continue;
            }

            let resolved = self.record_forfeit(m, side.opposite()).await?;
            touched.push(resolved.clone());
            touched.extend(self.propagate(&bracket, resolved).await?);
        }

        Ok(touched)
    }

    /// Reset a finished match to `pending`, clearing sets and winner.
    ///
    /// # Errors
    ///
    /// * `DrawError::State` - No result, a bye, or the winner already sits in
    ///   the successor (retract the advancement first)
    pub async fn delete_score(&self, match_id: MatchId) -> DrawResult<Match> {
        let mut m = self.load_match(match_id).await?;
        if !m.is_finished() {
            return Err(DrawError::state(format!("Match {} has no result", m.id)));
        }
        if m.is_bye {
            return Err(DrawError::state("Bye matches cannot be reset"));
        }

        if let (Some(next_id), Some(winner)) = (m.next_match_id, m.winner_team()) {
            let next = self.load_match(next_id).await?;
            if next.has_team(winner) {
                return Err(DrawError::state(format!(
                    "Winner of match {} already advanced to match {}; retract the advancement first",
                    m.id, next.id
                )));
            }
        }

        m.status = MatchStatus::Pending;
        m.sets.clear();
        m.winner = None;

        let stored = self.repo.update_match(&m).await?;
        log::info!("Score of match {} deleted", stored.id);
        Ok(stored)
    }

    /// Remove the winner of `match_id` from its successor's slot.
    ///
    /// Only allowed while the successor is `pending` or `scheduled`.
    /// Returns the successor.
    pub async fn retract_advancement(&self, match_id: MatchId) -> DrawResult<Match> {
        let m = self.load_match(match_id).await?;
        if m.is_bye {
            return Err(DrawError::state("Bye advancements cannot be retracted"));
        }
        let Some(next_id) = m.next_match_id else {
            return Err(DrawError::state(format!("Match {} has no successor", m.id)));
        };
        let Some(winner) = m.winner_team() else {
            return Err(DrawError::state(format!("Match {} has no winner", m.id)));
        };

        let mut next = self.load_match(next_id).await?;
        let slot = m
            .next_match_slot
            .unwrap_or_else(|| Side::for_pairing(m.slot));
        if next.team(slot) != Some(winner) {
            return Err(DrawError::state(format!(
                "Winner of match {} has not been advanced",
                m.id
            )));
        }
        if !matches!(next.status, MatchStatus::Pending | MatchStatus::Scheduled) {
            return Err(DrawError::state(format!(
                "Match {} has already started",
                next.id
            )));
        }

        next.set_team(slot, None);
        let stored = self.repo.update_match(&next).await?;
        log::info!("Retracted {} from match {}", winner, stored.id);
        Ok(stored)
    }
}

fn ensure_open(m: &Match) -> DrawResult<()> {
    if m.is_finished() {
        return Err(DrawError::state(format!(
            "Match {} already has a result",
            m.id
        )));
    }
    Ok(())
}

/// Side holding a withdrawn team when exactly one side is withdrawn
fn withdrawn_side(bracket: &Bracket, m: &Match) -> Option<Side> {
    let (Some(team1), Some(team2)) = (m.team1, m.team2) else {
        return None;
    };
    match (bracket.is_withdrawn(team1), bracket.is_withdrawn(team2)) {
        (true, false) => Some(Side::One),
        (false, true) => Some(Side::Two),
        (true, true) => {
            log::warn!("Both teams of match {} are withdrawn", m.id);
            None
        }
        (false, false) => None,
    }
}
