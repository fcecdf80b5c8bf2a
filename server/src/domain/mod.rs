//! Domain logic for the dashboard
//!
//! - `metrics` - facet fetching, normalization, scoring and panel building

pub mod metrics;

pub use metrics::{MetricsContext, Panel, PanelView};
