#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! Porchlightd - the Porchlight analytics daemon
//!
//! This daemon provides:
//! - Account registration and stateless cookie sessions
//! - Site provisioning (domains, settings, loader URLs)
//! - The public SDK configuration endpoint with a short-TTL cache
//! - The fixed loader script served to third-party pages

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod resolver;
pub mod sessions;
pub mod state;
pub mod store;
