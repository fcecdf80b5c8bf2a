//! Data access layer
//!
//! - `cache` - response cache with in-memory and Redis backends
//! - `sentry` - cache-aware Sentry REST API client

pub mod cache;
pub mod sentry;
