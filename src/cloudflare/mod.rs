//! Probe backend for Cloudflare's public speed-test service.

pub mod client;
pub mod probe;
pub(crate) mod requests;

pub use client::Client;
pub use probe::{CloudflareConfig, CloudflareProbe};
