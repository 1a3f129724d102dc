//! HTTP boundary for `racket_draw`.
//!
//! The binary in `main.rs` wires configuration, storage and the router
//! exposed here; tests drive the same router in process.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
