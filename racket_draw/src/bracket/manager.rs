//! Bracket service facade.
//!
//! [`BracketManager`] is the entry point used by the HTTP layer. It owns the
//! progression engine and the group stage manager, serializes every mutation
//! of a bracket behind a per-bracket async mutex, and keeps the bracket
//! lifecycle status up to date.

use std::collections::HashMap;
use std::sync::{Arc, MutexGuard};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::config::BracketConfig;
use super::generator;
use super::models::{
    Bracket, BracketFormat, BracketId, BracketStatus, BracketView, CategoryId, GeneratedBracket,
    MatchId, Phase, SeedingMethod, TeamId, TournamentId,
};
use crate::db::BracketRepository;
use crate::errors::{DrawError, DrawResult};
use crate::groups::manager::validate_assignment;
use crate::groups::{GroupAssignment, GroupStageManager, group_matches};
use crate::matches::{
    AdvanceOutcome, Match, MatchStatus, ProgressionEngine, ScheduleUpdate, SetScore, Side,
};
use crate::standings::{Standing, group_standings, knockout_standings};

/// Randomness source shared by everything that shuffles.
///
/// Locked synchronously and never held across an `.await`.
pub type SharedRng = Arc<std::sync::Mutex<StdRng>>;

pub(crate) fn lock_rng(rng: &SharedRng) -> MutexGuard<'_, StdRng> {
    rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Body of a create/generate request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBracketRequest {
    pub team_ids: Vec<TeamId>,
    pub format: BracketFormat,
    pub seeding_method: SeedingMethod,
    /// Open configuration block, see [`BracketConfig::from_value`]
    #[serde(default)]
    pub config: Value,
    /// Explicit group assignment (`groups_knockout` only)
    #[serde(default)]
    pub groups: Option<Vec<GroupAssignment>>,
    /// Distribute teams over this many groups (`groups_knockout` only)
    #[serde(default)]
    pub group_count: Option<u32>,
}

/// Bracket service
#[derive(Clone)]
pub struct BracketManager {
    repo: Arc<dyn BracketRepository>,
    engine: ProgressionEngine,
    groups: GroupStageManager,
    rng: SharedRng,
    /// Per-bracket mutation locks
    locks: Arc<Mutex<HashMap<BracketId, Arc<Mutex<()>>>>>,
    /// Serializes creation, when no bracket id exists yet
    create_lock: Arc<Mutex<()>>,
}

impl BracketManager {
    /// Create a new bracket manager seeded from the OS
    pub fn new(repo: Arc<dyn BracketRepository>) -> Self {
        Self::with_rng(repo, StdRng::from_os_rng())
    }

    /// Create a bracket manager with a caller-supplied randomness source
    pub fn with_rng(repo: Arc<dyn BracketRepository>, rng: StdRng) -> Self {
        let rng = Arc::new(std::sync::Mutex::new(rng));
        Self {
            engine: ProgressionEngine::new(repo.clone()),
            groups: GroupStageManager::new(repo.clone(), rng.clone()),
            repo,
            rng,
            locks: Arc::new(Mutex::new(HashMap::new())),
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn repository(&self) -> &Arc<dyn BracketRepository> {
        &self.repo
    }

    async fn lock_bracket(&self, bracket_id: BracketId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(bracket_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn lock_for_match(&self, match_id: MatchId) -> DrawResult<OwnedMutexGuard<()>> {
        let m = self.engine.load_match(match_id).await?;
        Ok(self.lock_bracket(m.bracket_id).await)
    }

    async fn load_bracket(&self, bracket_id: BracketId) -> DrawResult<Bracket> {
        self.repo
            .get_bracket(bracket_id)
            .await?
            .ok_or(DrawError::BracketNotFound(bracket_id))
    }

    async fn set_status(&self, mut bracket: Bracket, status: BracketStatus) -> DrawResult<Bracket> {
        bracket.status = status;
        bracket.updated_at = Utc::now();
        self.repo.upsert_bracket(&bracket).await?;
        log::info!("Bracket {} is now {}", bracket.id, status);
        Ok(bracket)
    }

    /// A draft bracket starts with its first recorded result
    async fn mark_started(&self, bracket_id: BracketId) -> DrawResult<()> {
        let bracket = self.load_bracket(bracket_id).await?;
        if bracket.status == BracketStatus::Draft {
            self.set_status(bracket, BracketStatus::InProgress).await?;
        }
        Ok(())
    }

    fn seed_order(&self, team_ids: &[TeamId], seeding: SeedingMethod) -> Vec<TeamId> {
        let mut seeds = team_ids.to_vec();
        if seeding == SeedingMethod::Random {
            seeds.shuffle(&mut *lock_rng(&self.rng));
        }
        seeds
    }

    /// Create (or regenerate) the bracket of a tournament category.
    ///
    /// An existing bracket is replaced only while it is still a draft.
    ///
    /// # Errors
    ///
    /// * `DrawError::Validation` - Bad team list, configuration or groups
    /// * `DrawError::State` - A started or published bracket already exists
    pub async fn create_bracket(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
        request: CreateBracketRequest,
    ) -> DrawResult<BracketView> {
        let config = BracketConfig::from_value(request.config.clone())?;
        generator::validate_teams(&request.team_ids)?;

        let _create = self.create_lock.lock().await;

        let existing = self.repo.find_bracket(tournament_id, category_id).await?;
        if let Some(existing) = existing
            .as_ref()
            .filter(|b| b.status != BracketStatus::Draft)
        {
            return Err(DrawError::state(format!(
                "Bracket {} for this category is already {}",
                existing.id, existing.status
            )));
        }

        let bracket = Bracket::new(
            tournament_id,
            category_id,
            request.format,
            request.seeding_method,
            config,
        );

        // Everything that can reject the request runs before the old draft goes.
        let matches = match request.format {
            BracketFormat::Knockout => {
                if request.groups.is_some() || request.group_count.is_some() {
                    return Err(DrawError::validation("Knockout brackets take no groups"));
                }
                let mut rng = lock_rng(&self.rng);
                generator::generate(
                    bracket.id,
                    &request.team_ids,
                    request.seeding_method,
                    &mut *rng,
                )?
                .matches
            }
            BracketFormat::RoundRobin => {
                if request.groups.is_some() || request.group_count.is_some() {
                    return Err(DrawError::validation(
                        "Round-robin brackets hold a single group",
                    ));
                }
                let group = GroupAssignment {
                    group_number: 1,
                    team_ids: self.seed_order(&request.team_ids, request.seeding_method),
                };
                validate_assignment(std::slice::from_ref(&group))?;
                group_matches(bracket.id, group.group_number, &group.team_ids)
            }
            BracketFormat::GroupsKnockout => {
                let assignment = match (request.groups, request.group_count) {
                    (Some(groups), _) => {
                        ensure_covers(&groups, &request.team_ids)?;
                        groups
                    }
                    (None, Some(count)) => {
                        let seeds = self.seed_order(&request.team_ids, request.seeding_method);
                        distribute(&seeds, count)?
                    }
                    (None, None) => Vec::new(),
                };
                if !assignment.is_empty() {
                    validate_assignment(&assignment)?;
                }
                assignment
                    .iter()
                    .flat_map(|g| group_matches(bracket.id, g.group_number, &g.team_ids))
                    .collect()
            }
        };

        if let Some(existing) = existing {
            let _guard = self.lock_bracket(existing.id).await;
            self.repo.delete_bracket(existing.id).await?;
            log::info!("Replacing draft bracket {}", existing.id);
        }

        self.repo.upsert_bracket(&bracket).await?;
        self.repo.insert_matches(&matches).await?;

        log::info!(
            "Created {} bracket {} with {} teams and {} matches",
            bracket.format,
            bracket.id,
            request.team_ids.len(),
            matches.len()
        );

        Ok(BracketView {
            bracket,
            matches,
            standings: Vec::new(),
        })
    }

    pub async fn get_bracket(&self, bracket_id: BracketId) -> DrawResult<Bracket> {
        self.load_bracket(bracket_id).await
    }

    /// Bracket with matches and stored standings, read concurrently
    pub async fn get_bracket_view(&self, bracket_id: BracketId) -> DrawResult<BracketView> {
        let (bracket, matches, standings) = tokio::join!(
            self.repo.get_bracket(bracket_id),
            self.repo.list_matches(bracket_id),
            self.repo.list_standings(bracket_id),
        );

        Ok(BracketView {
            bracket: bracket?.ok_or(DrawError::BracketNotFound(bracket_id))?,
            matches: matches?,
            standings: standings?,
        })
    }

    pub async fn list_brackets(&self, tournament_id: TournamentId) -> DrawResult<Vec<Bracket>> {
        self.repo.list_brackets(tournament_id).await
    }

    /// Delete a bracket that is still a draft
    pub async fn delete_bracket(&self, bracket_id: BracketId) -> DrawResult<()> {
        {
            let _guard = self.lock_bracket(bracket_id).await;
            let bracket = self.load_bracket(bracket_id).await?;
            if bracket.status != BracketStatus::Draft {
                return Err(DrawError::state(format!(
                    "Only draft brackets can be deleted, bracket is {}",
                    bracket.status
                )));
            }
            self.repo.delete_bracket(bracket_id).await?;
        }

        self.locks.lock().await.remove(&bracket_id);
        log::info!("Deleted bracket {}", bracket_id);
        Ok(())
    }

    /// Freeze the structure of a bracket
    pub async fn publish(&self, bracket_id: BracketId) -> DrawResult<Bracket> {
        let _guard = self.lock_bracket(bracket_id).await;
        let bracket = self.load_bracket(bracket_id).await?;
        if bracket.status == BracketStatus::Published {
            return Err(DrawError::state("Bracket is already published"));
        }
        self.set_status(bracket, BracketStatus::Published).await
    }

    /// Reopen a published bracket; it returns to `in_progress`
    pub async fn unpublish(&self, bracket_id: BracketId) -> DrawResult<Bracket> {
        let _guard = self.lock_bracket(bracket_id).await;
        let bracket = self.load_bracket(bracket_id).await?;
        if bracket.status != BracketStatus::Published {
            return Err(DrawError::state("Bracket is not published"));
        }
        self.set_status(bracket, BracketStatus::InProgress).await
    }

    /// Recompute and store standings for every phase the bracket has
    pub async fn calculate_standings(&self, bracket_id: BracketId) -> DrawResult<Vec<Standing>> {
        let _guard = self.lock_bracket(bracket_id).await;
        let bracket = self.load_bracket(bracket_id).await?;
        let matches = self.repo.list_matches(bracket_id).await?;
        let config = &bracket.config;

        let mut all = Vec::new();
        if bracket.format.has_groups() {
            let rows = group_standings(bracket_id, &matches, config.group_win_points);
            self.repo
                .replace_standings(bracket_id, Phase::Groups, &rows)
                .await?;
            all.extend(rows);
        }
        if bracket.format != BracketFormat::RoundRobin {
            let rows = knockout_standings(bracket_id, &matches, &config.knockout_points);
            self.repo
                .replace_standings(bracket_id, Phase::Knockout, &rows)
                .await?;
            all.extend(rows);
        }

        log::debug!("Calculated {} standing rows for bracket {}", all.len(), bracket_id);
        Ok(all)
    }

    pub async fn get_standings(&self, bracket_id: BracketId) -> DrawResult<Vec<Standing>> {
        self.load_bracket(bracket_id).await?;
        self.repo.list_standings(bracket_id).await
    }

    pub async fn schedule_match(&self, match_id: MatchId, update: ScheduleUpdate) -> DrawResult<Match> {
        let _guard = self.lock_for_match(match_id).await?;
        self.engine.schedule(match_id, update).await
    }

    pub async fn set_match_status(&self, match_id: MatchId, status: MatchStatus) -> DrawResult<Match> {
        let _guard = self.lock_for_match(match_id).await?;
        self.engine.set_status(match_id, status).await
    }

    /// Organizer score submission
    pub async fn submit_score(&self, match_id: MatchId, sets: &[SetScore]) -> DrawResult<Match> {
        let _guard = self.lock_for_match(match_id).await?;
        let stored = self.engine.submit_score(match_id, sets).await?;
        self.mark_started(stored.bracket_id).await?;
        Ok(stored)
    }

    /// Score reported by one of the playing teams
    pub async fn submit_player_score(
        &self,
        match_id: MatchId,
        caller: TeamId,
        sets: &[SetScore],
    ) -> DrawResult<Match> {
        let _guard = self.lock_for_match(match_id).await?;
        let stored = self
            .engine
            .submit_player_score(match_id, caller, sets)
            .await?;
        self.mark_started(stored.bracket_id).await?;
        Ok(stored)
    }

    pub async fn delete_score(&self, match_id: MatchId) -> DrawResult<Match> {
        let _guard = self.lock_for_match(match_id).await?;
        self.engine.delete_score(match_id).await
    }

    pub async fn advance(&self, match_id: MatchId) -> DrawResult<AdvanceOutcome> {
        let _guard = self.lock_for_match(match_id).await?;
        self.engine.advance(match_id).await
    }

    pub async fn retract_advancement(&self, match_id: MatchId) -> DrawResult<Match> {
        let _guard = self.lock_for_match(match_id).await?;
        self.engine.retract_advancement(match_id).await
    }

    pub async fn forfeit(&self, match_id: MatchId, winner: Side) -> DrawResult<Vec<Match>> {
        let _guard = self.lock_for_match(match_id).await?;
        let touched = self.engine.forfeit(match_id, winner).await?;
        if let Some(first) = touched.first() {
            self.mark_started(first.bracket_id).await?;
        }
        Ok(touched)
    }

    pub async fn withdraw_team(&self, bracket_id: BracketId, team: TeamId) -> DrawResult<Vec<Match>> {
        let _guard = self.lock_bracket(bracket_id).await;
        let touched = self.engine.withdraw_team(bracket_id, team).await?;
        self.mark_started(bracket_id).await?;
        Ok(touched)
    }

    pub async fn assign_groups(
        &self,
        bracket_id: BracketId,
        groups: &[GroupAssignment],
    ) -> DrawResult<Vec<Match>> {
        let _guard = self.lock_bracket(bracket_id).await;
        self.groups.assign_groups(bracket_id, groups).await
    }

    pub async fn swap_teams(
        &self,
        bracket_id: BracketId,
        team_a: TeamId,
        team_b: TeamId,
    ) -> DrawResult<Vec<Match>> {
        let _guard = self.lock_bracket(bracket_id).await;
        self.groups.swap_teams(bracket_id, team_a, team_b).await
    }

    pub async fn generate_knockout(&self, bracket_id: BracketId) -> DrawResult<GeneratedBracket> {
        let _guard = self.lock_bracket(bracket_id).await;
        self.groups.generate_knockout(bracket_id).await
    }

    pub async fn delete_knockout(&self, bracket_id: BracketId) -> DrawResult<usize> {
        let _guard = self.lock_bracket(bracket_id).await;
        self.groups.delete_knockout(bracket_id).await
    }
}

/// Explicit groups must place exactly the listed teams
fn ensure_covers(groups: &[GroupAssignment], team_ids: &[TeamId]) -> DrawResult<()> {
    let assigned: usize = groups.iter().map(|g| g.team_ids.len()).sum();
    let all_listed = groups
        .iter()
        .flat_map(|g| g.team_ids.iter())
        .all(|t| team_ids.contains(t));

    if assigned != team_ids.len() || !all_listed {
        return Err(DrawError::validation(
            "Groups must contain every listed team exactly once",
        ));
    }
    Ok(())
}

/// Snake distribution of the seed order over `count` groups
fn distribute(seeds: &[TeamId], count: u32) -> DrawResult<Vec<GroupAssignment>> {
    if count == 0 {
        return Err(DrawError::validation("Group count must be at least 1"));
    }

    let count = count as usize;
    let mut groups: Vec<GroupAssignment> = (1..=count as u32)
        .map(|group_number| GroupAssignment {
            group_number,
            team_ids: Vec::new(),
        })
        .collect();

    for (i, &team) in seeds.iter().enumerate() {
        let (row, col) = (i / count, i % count);
        let index = if row % 2 == 0 { col } else { count - 1 - col };
        groups[index].team_ids.push(team);
    }
    Ok(groups)
}
