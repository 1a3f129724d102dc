//! Bracket structure, configuration and the service facade.

pub mod config;
pub mod generator;
pub mod manager;
pub mod models;

pub use config::{BracketConfig, KnockoutPoints, MatchFormat};
pub use manager::{BracketManager, CreateBracketRequest, SharedRng};
pub use models::{
    Bracket, BracketFormat, BracketId, BracketStatus, BracketView, GeneratedBracket, Phase,
    RoundInfo, SeedingMethod, TeamId,
};
