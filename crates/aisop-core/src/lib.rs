//! Core library for AI-SOP phase tracking: agent sessions moving through a
//! phase graph, with decision, transition and PB&J checkpoint logs stored
//! one JSON file per session.

pub mod config;
pub mod error;
pub mod graph;
pub mod io;
pub mod paths;
pub mod session;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod types;

pub use error::{PhaseError, Result};
pub use tracker::{EndOutcome, PhaseTracker};
