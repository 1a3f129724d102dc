//! Set-by-set score validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{SetScore, Side};
use crate::bracket::MatchFormat;

/// Winner-side set scores accepted by the sport; the mirrored scores are
/// accepted for the other side.
pub const LEGAL_SET_SCORES: [(u8, u8); 7] = [(6, 0), (6, 1), (6, 2), (6, 3), (6, 4), (7, 5), (7, 6)];

/// Reasons a submitted score is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ScoreError {
    #[error("At least one set must be submitted")]
    NoSets,

    #[error("Set {set}: {score} is not a valid set score")]
    IllegalSet { set: usize, score: SetScore },

    #[error("Match is not decided: sets {team1_sets}-{team2_sets}, {required} needed to win")]
    Undecided {
        team1_sets: u8,
        team2_sets: u8,
        required: u8,
    },
}

/// Accepted score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedScore {
    /// Sets up to and including the deciding one
    pub sets: Vec<SetScore>,
    pub team1_sets: u8,
    pub team2_sets: u8,
    pub winner: Side,
}

/// Whether a single set score is legal
pub fn is_legal_set(set: &SetScore) -> bool {
    LEGAL_SET_SCORES
        .iter()
        .any(|&(w, l)| (set.team1, set.team2) == (w, l) || (set.team2, set.team1) == (w, l))
}

/// Validate a submitted score.
///
/// Sets are read in order until one side reaches the sets needed by
/// `format`. Anything after the deciding set is ignored, even if it would
/// not be a legal set on its own.
pub fn validate(sets: &[SetScore], format: MatchFormat) -> Result<ValidatedScore, ScoreError> {
    if sets.is_empty() {
        return Err(ScoreError::NoSets);
    }

    let required = format.sets_to_win();
    let mut team1_sets = 0u8;
    let mut team2_sets = 0u8;

    for (i, set) in sets.iter().enumerate() {
        if !is_legal_set(set) {
            return Err(ScoreError::IllegalSet {
                set: i + 1,
                score: *set,
            });
        }

        // Legal set scores are never level.
        if set.team1 > set.team2 {
            team1_sets += 1;
        } else {
            team2_sets += 1;
        }

        let winner = if team1_sets == required {
            Some(Side::One)
        } else if team2_sets == required {
            Some(Side::Two)
        } else {
            None
        };

        if let Some(winner) = winner {
            if i + 1 < sets.len() {
                log::debug!("Ignoring {} set(s) after the deciding set", sets.len() - i - 1);
            }
            return Ok(ValidatedScore {
                sets: sets[..=i].to_vec(),
                team1_sets,
                team2_sets,
                winner,
            });
        }
    }

    Err(ScoreError::Undecided {
        team1_sets,
        team2_sets,
        required,
    })
}
