//! Standing data models.

use serde::{Deserialize, Serialize};

use crate::bracket::models::{BracketId, Phase, TeamId};

/// Ranking row for a team, overall or within one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub bracket_id: BracketId,
    pub team_id: TeamId,
    /// Present for group-stage rows only
    pub group_number: Option<u32>,
    /// 1-indexed rank within the group (or overall for knockout rows)
    pub position: u32,
    pub played: u32,
    pub won: u32,
    pub lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub points: i32,
    /// Furthest knockout round reached (knockout rows only)
    pub furthest_round: Option<u32>,
    /// Knocked out of the bracket (knockout rows only)
    pub eliminated: bool,
}

impl Standing {
    pub fn new(bracket_id: BracketId, team_id: TeamId, group_number: Option<u32>) -> Self {
        Self {
            bracket_id,
            team_id,
            group_number,
            position: 0,
            played: 0,
            won: 0,
            lost: 0,
            games_won: 0,
            games_lost: 0,
            points: 0,
            furthest_round: None,
            eliminated: false,
        }
    }

    pub fn game_difference(&self) -> i64 {
        i64::from(self.games_won) - i64::from(self.games_lost)
    }

    pub fn phase(&self) -> Phase {
        Phase::of_group(self.group_number)
    }
}
