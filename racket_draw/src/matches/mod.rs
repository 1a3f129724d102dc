//! Match lifecycle: data model, score validation and winner progression.

pub mod engine;
pub mod models;
pub mod score;

pub use engine::{AdvanceOutcome, ProgressionEngine};
pub use models::{Match, MatchStatus, ScheduleUpdate, SetScore, Side};
pub use score::{ScoreError, ValidatedScore, validate};
