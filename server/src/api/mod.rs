//! HTTP surface: dashboard pages, panel fragments, health and assets

mod embedded;
pub mod middleware;
pub mod routes;
mod server;
pub mod types;

pub use server::{ApiServer, build_router};
