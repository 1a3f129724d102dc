//! Standings for knockout brackets and round-robin groups.

pub mod calculator;
pub mod models;

pub use calculator::{group_standings, knockout_standings};
pub use models::Standing;
