//! Tracing subscriber setup and bracket event helpers.
//!
//! `racket_draw` logs through the `log` facade; the subscriber picks those
//! records up as well.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,racket_draw=info,sqlx=warn,hyper=warn";

/// Draw operations slower than this are reported at warn level
const SLOW_OPERATION: Duration = Duration::from_millis(500);

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Organizer-visible change to a bracket
pub fn log_bracket_event(event: &str, bracket_id: Uuid, detail: &str) {
    tracing::info!(event, bracket_id = %bracket_id, "bracket {}: {}", event, detail);
}

/// Timing of a draw operation, `request_id` when the caller carries one
pub fn log_timing(operation: &str, elapsed: Duration, request_id: Option<&str>) {
    let elapsed_ms = elapsed.as_millis() as u64;
    if elapsed >= SLOW_OPERATION {
        tracing::warn!(operation, elapsed_ms, request_id, "slow draw operation");
    } else {
        tracing::debug!(operation, elapsed_ms, request_id, "draw operation finished");
    }
}
