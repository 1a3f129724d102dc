//! Match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::bracket::models::{BracketId, MatchId, TeamId};
use crate::errors::DrawError;

/// One of the two slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "team1")]
    One,
    #[serde(rename = "team2")]
    Two,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Slot fed by the pairing at `index` within its round
    pub fn for_pairing(index: u32) -> Self {
        if index % 2 == 0 { Side::One } else { Side::Two }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::One => write!(f, "team1"),
            Side::Two => write!(f, "team2"),
        }
    }
}

impl FromStr for Side {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "team1" | "1" => Ok(Side::One),
            "team2" | "2" => Ok(Side::Two),
            other => Err(DrawError::validation(format!("Invalid side: {other}"))),
        }
    }
}

/// Games won by each side in a single set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub team1: u8,
    pub team2: u8,
}

impl SetScore {
    pub fn new(team1: u8, team2: u8) -> Self {
        Self { team1, team2 }
    }

    /// Side that took the set, `None` for a level score
    pub fn winner(&self) -> Option<Side> {
        match self.team1.cmp(&self.team2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn games(&self, side: Side) -> u8 {
        match side {
            Side::One => self.team1,
            Side::Two => self.team2,
        }
    }
}

impl std::fmt::Display for SetScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.team1, self.team2)
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Forfeit,
}

impl MatchStatus {
    /// Completed or forfeited
    pub fn is_finished(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Forfeit)
    }

    /// Administrative transitions reachable without a score.
    ///
    /// `completed` is only reached through score submission and `forfeit`
    /// through the forfeit/withdrawal paths, so neither is listed here.
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Pending, MatchStatus::Scheduled)
                | (MatchStatus::Pending, MatchStatus::InProgress)
                | (MatchStatus::Scheduled, MatchStatus::InProgress)
                | (MatchStatus::Scheduled, MatchStatus::Pending)
        )
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::Scheduled => write!(f, "scheduled"),
            MatchStatus::InProgress => write!(f, "in_progress"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Forfeit => write!(f, "forfeit"),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "forfeit" => Ok(MatchStatus::Forfeit),
            other => Err(DrawError::validation(format!(
                "Invalid match status: {other}"
            ))),
        }
    }
}

/// A single match of a bracket, knockout or group stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub bracket_id: BracketId,
    /// Round number, 1-indexed within its phase
    pub round: u32,
    pub round_name: String,
    /// Position inside the round, 0-indexed
    pub slot: u32,
    pub team1: Option<TeamId>,
    pub team2: Option<TeamId>,
    pub winner: Option<Side>,
    pub sets: Vec<SetScore>,
    pub status: MatchStatus,
    /// Present only for group-stage matches
    pub group_number: Option<u32>,
    pub next_match_id: Option<MatchId>,
    pub next_match_slot: Option<Side>,
    pub court: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// First-round match resolved by a bye, never played
    pub is_bye: bool,
    /// Incremented on every stored write
    pub version: i64,
}

impl Match {
    /// Create an empty pending match
    pub fn new(bracket_id: BracketId, round: u32, round_name: impl Into<String>, slot: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            bracket_id,
            round,
            round_name: round_name.into(),
            slot,
            team1: None,
            team2: None,
            winner: None,
            sets: Vec::new(),
            status: MatchStatus::Pending,
            group_number: None,
            next_match_id: None,
            next_match_slot: None,
            court: None,
            scheduled_at: None,
            is_bye: false,
            version: 0,
        }
    }

    pub fn team(&self, side: Side) -> Option<TeamId> {
        match side {
            Side::One => self.team1,
            Side::Two => self.team2,
        }
    }

    pub fn set_team(&mut self, side: Side, team: Option<TeamId>) {
        match side {
            Side::One => self.team1 = team,
            Side::Two => self.team2 = team,
        }
    }

    /// Which side `team` plays on, if any
    pub fn side_of(&self, team: TeamId) -> Option<Side> {
        if self.team1 == Some(team) {
            Some(Side::One)
        } else if self.team2 == Some(team) {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn has_team(&self, team: TeamId) -> bool {
        self.side_of(team).is_some()
    }

    pub fn winner_team(&self) -> Option<TeamId> {
        self.winner.and_then(|side| self.team(side))
    }

    pub fn loser_team(&self) -> Option<TeamId> {
        self.winner.and_then(|side| self.team(side.opposite()))
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn is_group_match(&self) -> bool {
        self.group_number.is_some()
    }

    /// Both slots resolved
    pub fn is_ready(&self) -> bool {
        self.team1.is_some() && self.team2.is_some()
    }

    /// Games won by `side` over all recorded sets
    pub fn games(&self, side: Side) -> u32 {
        self.sets.iter().map(|s| u32::from(s.games(side))).sum()
    }
}

/// Scheduling metadata written by the external scheduler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub court: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}
