//! # Racket Draw
//!
//! Bracket management for racket-sport tournaments: knockout and
//! round-robin draws, set-score validation, winner progression and
//! standings.
//!
//! ## Architecture
//!
//! - [`bracket`]: bracket model, configuration block, the knockout
//!   generator and [`BracketManager`], the service facade
//! - [`matches`]: match model, [`matches::validate`] for set scores and the
//!   [`ProgressionEngine`] moving winners through the tree
//! - [`groups`]: round-robin group stage and the hand-off to a knockout phase
//! - [`standings`]: knockout and group rankings
//! - [`db`]: the [`BracketRepository`] storage trait with PostgreSQL and
//!   in-memory implementations
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use racket_draw::{BracketFormat, BracketManager, CreateBracketRequest, SeedingMethod};
//! use racket_draw::db::InMemoryRepository;
//! use uuid::Uuid;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), racket_draw::DrawError> {
//! let manager = BracketManager::new(Arc::new(InMemoryRepository::new()));
//! let teams: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();
//!
//! let view = manager
//!     .create_bracket(
//!         Uuid::new_v4(),
//!         Uuid::new_v4(),
//!         CreateBracketRequest {
//!             team_ids: teams,
//!             format: BracketFormat::Knockout,
//!             seeding_method: SeedingMethod::Manual,
//!             config: serde_json::Value::Null,
//!             groups: None,
//!             group_count: None,
//!         },
//!     )
//!     .await?;
//! assert_eq!(view.matches.len(), 7);
//! # Ok(())
//! # }
//! ```

pub mod bracket;
pub mod db;
pub mod errors;
pub mod groups;
pub mod matches;
pub mod standings;

pub use bracket::{
    Bracket, BracketConfig, BracketFormat, BracketManager, BracketStatus, BracketView,
    CreateBracketRequest, KnockoutPoints, MatchFormat, SeedingMethod,
};
pub use db::BracketRepository;
pub use errors::{DrawError, DrawResult, ErrorKind};
pub use groups::GroupAssignment;
pub use matches::{AdvanceOutcome, Match, MatchStatus, ProgressionEngine, SetScore, Side};
pub use standings::Standing;
