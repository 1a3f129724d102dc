//! Bracket configuration block.
//!
//! The configuration is stored as an open JSON document. It is parsed once
//! into [`BracketConfig`] with explicit defaults for every missing key, and
//! unknown keys are ignored so newer clients can store extra settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DrawError, DrawResult};

/// Number of sets a match is played over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchFormat {
    #[serde(rename = "single_set", alias = "best_of_1")]
    SingleSet,
    #[default]
    #[serde(rename = "best_of_3")]
    BestOfThree,
    #[serde(rename = "best_of_5")]
    BestOfFive,
}

impl MatchFormat {
    /// Sets a side must win to take the match
    pub fn sets_to_win(self) -> u8 {
        match self {
            MatchFormat::SingleSet => 1,
            MatchFormat::BestOfThree => 2,
            MatchFormat::BestOfFive => 3,
        }
    }

    /// Longest possible match in sets
    pub fn max_sets(self) -> usize {
        usize::from(self.sets_to_win()) * 2 - 1
    }
}

impl std::fmt::Display for MatchFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchFormat::SingleSet => write!(f, "single_set"),
            MatchFormat::BestOfThree => write!(f, "best_of_3"),
            MatchFormat::BestOfFive => write!(f, "best_of_5"),
        }
    }
}

/// Points awarded per knockout finishing tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutPoints {
    /// Champion (default: 100)
    pub winner: i32,
    /// Lost the final (default: 70)
    pub finalist: i32,
    /// Lost a semifinal (default: 50)
    pub semi_finalist: i32,
    /// Lost a quarterfinal (default: 30)
    pub quarter_finalist: i32,
    /// Earlier exits start from this value (default: 10)
    pub base_points: i32,
    /// Added per round reached for earlier exits (default: 5)
    pub per_round_bonus: i32,
}

impl Default for KnockoutPoints {
    fn default() -> Self {
        Self {
            winner: 100,
            finalist: 70,
            semi_finalist: 50,
            quarter_finalist: 30,
            base_points: 10,
            per_round_bonus: 5,
        }
    }
}

/// Bracket configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BracketConfig {
    /// Sets per match (default: best of three)
    pub match_format: MatchFormat,
    /// Knockout tier points
    pub knockout_points: KnockoutPoints,
    /// Points for a group-stage win (default: 3)
    pub group_win_points: i32,
    /// Finishers per group that reach the knockout phase (default: 2)
    pub top_per_group: u32,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            match_format: MatchFormat::default(),
            knockout_points: KnockoutPoints::default(),
            group_win_points: 3,
            top_per_group: 2,
        }
    }
}

impl BracketConfig {
    /// Parse an open configuration document.
    ///
    /// `null` yields the defaults. Keys that are present but carry the wrong
    /// type are rejected rather than silently defaulted.
    pub fn from_value(value: Value) -> DrawResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }

        let config: BracketConfig = serde_json::from_value(value)
            .map_err(|e| DrawError::validation(format!("Invalid bracket configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DrawResult<()> {
        if self.top_per_group == 0 {
            return Err(DrawError::validation("topPerGroup must be at least 1"));
        }
        if self.group_win_points < 0 {
            return Err(DrawError::validation("groupWinPoints cannot be negative"));
        }
        Ok(())
    }

    pub fn sets_to_win(&self) -> u8 {
        self.match_format.sets_to_win()
    }
}
