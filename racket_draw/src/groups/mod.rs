//! Round-robin group stage.

pub mod manager;
pub mod round_robin;

pub use manager::{GroupAssignment, GroupStageManager, current_groups, qualifiers};
pub use round_robin::{circle_rounds, group_matches};
