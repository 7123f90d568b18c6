//! Network suitability analysis.
//!
//! Measures download, upload, ping and jitter through a pluggable
//! [`probe::NetworkProbe`], then rates the connection against a catalog of
//! real-world use cases and derives improvement suggestions.

pub mod catalog;
pub mod classifier;
pub mod cloudflare;
pub mod display;
pub mod errors;
pub mod jitter;
pub mod measurements;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod results;
pub mod retry;
pub mod snapshot;
pub mod stats;
pub mod suggestions;
