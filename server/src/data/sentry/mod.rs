//! Sentry REST API access
//!
//! - `client` - cache-aware GET/JSON client
//! - `error` - fetch failures

mod client;
mod error;

pub use client::SentryClient;
pub use error::FetchError;
