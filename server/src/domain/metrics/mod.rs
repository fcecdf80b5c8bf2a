//! Service health metrics
//!
//! - `window` - current and comparison reporting windows
//! - `query` / `facets` - events API query templates
//! - `normalize` - raw response to short-keyed records
//! - `fetch` - cache-aware facet fetchers and organization metadata
//! - `score` / `format` - threshold scoring and display formatting
//! - `panels` - display-ready panel view models

pub mod facets;
pub mod fetch;
pub mod format;
pub mod normalize;
pub mod organization;
pub mod panels;
pub mod query;
pub mod score;
pub mod window;

pub use facets::Facet;
pub use fetch::{Comparison, MetricsContext, QueryStat};
pub use normalize::{MetricRecord, Normalized, RawMetricResponse};
pub use organization::{OrgDirectory, OrgMetadata, ProjectLink};
pub use panels::{MetricCard, Panel, PanelBody, PanelView, QueryRow, build_all_panels, build_panel};
pub use score::Score;
pub use window::{Clock, FixedClock, Period, SystemClock, TimeWindow, compute_window};
