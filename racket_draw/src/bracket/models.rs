//! Bracket data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::config::BracketConfig;
use crate::errors::DrawError;
use crate::matches::Match;
use crate::standings::Standing;

/// Bracket ID type
pub type BracketId = Uuid;
/// Match ID type
pub type MatchId = Uuid;
/// Team ID type (teams live in the external roster)
pub type TeamId = Uuid;
/// Tournament ID type
pub type TournamentId = Uuid;
/// Category ID type
pub type CategoryId = Uuid;

/// Competition format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketFormat {
    /// Single elimination
    Knockout,
    /// One round-robin group holding every team
    RoundRobin,
    /// Round-robin groups feeding a knockout phase
    GroupsKnockout,
}

impl BracketFormat {
    /// Whether the format has a group stage
    pub fn has_groups(self) -> bool {
        matches!(self, BracketFormat::RoundRobin | BracketFormat::GroupsKnockout)
    }
}

impl std::fmt::Display for BracketFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketFormat::Knockout => write!(f, "knockout"),
            BracketFormat::RoundRobin => write!(f, "round_robin"),
            BracketFormat::GroupsKnockout => write!(f, "groups_knockout"),
        }
    }
}

impl FromStr for BracketFormat {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knockout" => Ok(BracketFormat::Knockout),
            "round_robin" => Ok(BracketFormat::RoundRobin),
            "groups_knockout" => Ok(BracketFormat::GroupsKnockout),
            other => Err(DrawError::validation(format!(
                "Invalid bracket format: {other}"
            ))),
        }
    }
}

/// How the initial seed order is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedingMethod {
    /// Shuffle the team list
    Random,
    /// Organizer-supplied order
    Manual,
    /// Order resolved from a ranking by the caller
    Ranking,
}

impl std::fmt::Display for SeedingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedingMethod::Random => write!(f, "random"),
            SeedingMethod::Manual => write!(f, "manual"),
            SeedingMethod::Ranking => write!(f, "ranking"),
        }
    }
}

impl FromStr for SeedingMethod {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SeedingMethod::Random),
            "manual" => Ok(SeedingMethod::Manual),
            "ranking" => Ok(SeedingMethod::Ranking),
            other => Err(DrawError::validation(format!(
                "Invalid seeding method: {other}"
            ))),
        }
    }
}

/// Bracket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketStatus {
    Draft,
    InProgress,
    Published,
}

impl BracketStatus {
    /// Pairings and round topology may not change
    pub fn is_structure_locked(self) -> bool {
        self == BracketStatus::Published
    }
}

impl std::fmt::Display for BracketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketStatus::Draft => write!(f, "draft"),
            BracketStatus::InProgress => write!(f, "in_progress"),
            BracketStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for BracketStatus {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BracketStatus::Draft),
            "in_progress" => Ok(BracketStatus::InProgress),
            "published" => Ok(BracketStatus::Published),
            other => Err(DrawError::validation(format!(
                "Invalid bracket status: {other}"
            ))),
        }
    }
}

/// Competition phase a match or standing row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Groups,
    Knockout,
}

impl Phase {
    pub fn of_group(group_number: Option<u32>) -> Self {
        if group_number.is_some() {
            Phase::Groups
        } else {
            Phase::Knockout
        }
    }
}

/// Bracket for one (tournament, category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: BracketId,
    pub tournament_id: TournamentId,
    pub category_id: CategoryId,
    pub format: BracketFormat,
    pub seeding_method: SeedingMethod,
    pub status: BracketStatus,
    pub config: BracketConfig,
    /// Teams withdrawn from the competition
    pub withdrawn_teams: Vec<TeamId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bracket {
    /// Create a new draft bracket
    pub fn new(
        tournament_id: TournamentId,
        category_id: CategoryId,
        format: BracketFormat,
        seeding_method: SeedingMethod,
        config: BracketConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            category_id,
            format,
            seeding_method,
            status: BracketStatus::Draft,
            config,
            withdrawn_teams: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_withdrawn(&self, team: TeamId) -> bool {
        self.withdrawn_teams.contains(&team)
    }
}

/// Summary of one knockout round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub number: u32,
    pub name: String,
    pub match_count: u32,
}

/// Output of the bracket generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedBracket {
    pub rounds: Vec<RoundInfo>,
    pub matches: Vec<Match>,
}

/// Bracket with its matches and standings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketView {
    pub bracket: Bracket,
    pub matches: Vec<Match>,
    pub standings: Vec<Standing>,
}
