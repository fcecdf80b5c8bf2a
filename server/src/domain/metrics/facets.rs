//! Facet query templates
//!
//! Each facet is one fixed events query plus the table that re-keys its
//! result fields.

use std::fmt;

use super::normalize::RenameTable;
use super::query::{Dataset, EventsQuery, events_path};
use crate::core::constants::FACET_PAGE_SIZE;

const FRONTEND_QUERY: &str = r#"transaction.op:[pageload,""] span.op:[ui.interaction.click,ui.interaction.hover,ui.interaction.drag,ui.interaction.press,""] !transaction:"<< unparameterized >>""#;

const FRONTEND_FIELDS: &[&str] = &[
    "p75(measurements.ttfb)",
    "p75(measurements.fcp)",
    "p75(measurements.inp)",
    "performance_score(measurements.score.ttfb)",
    "performance_score(measurements.score.fcp)",
    "performance_score(measurements.score.inp)",
];

const FRONTEND_RENAMES: RenameTable = &[
    ("p75(measurements.ttfb)", "ttfb"),
    ("p75(measurements.fcp)", "fcp"),
    ("p75(measurements.inp)", "inp"),
    ("performance_score(measurements.score.ttfb)", "ttfb_score"),
    ("performance_score(measurements.score.fcp)", "fcp_score"),
    ("performance_score(measurements.score.inp)", "inp_score"),
];

const BACKEND_FIELDS: &[&str] = &["failure_rate()", "apdex()"];

const BACKEND_RENAMES: RenameTable = &[("failure_rate()", "failure_rate"), ("apdex()", "apdex")];

const REQUESTS_FIELDS: &[&str] = &[
    "http_response_rate(3)",
    "http_response_rate(4)",
    "http_response_rate(5)",
    "avg(span.self_time)",
];

const REQUESTS_RENAMES: RenameTable = &[
    ("http_response_rate(3)", "response_rate_3xx"),
    ("http_response_rate(4)", "response_rate_4xx"),
    ("http_response_rate(5)", "response_rate_5xx"),
    ("avg(span.self_time)", "time_avg"),
];

const CACHE_FIELDS: &[&str] = &[
    "project",
    "project.id",
    "transaction",
    "cache_miss_rate()",
    "sum(span.self_time)",
    "avg(cache.item_size)",
    "time_spent_percentage()",
];

const CACHE_RENAMES: RenameTable = &[
    ("cache_miss_rate()", "miss_rate"),
    ("sum(span.self_time)", "time_total"),
    ("avg(cache.item_size)", "item_size_avg"),
];

const QUEUE_FIELDS: &[&str] = &[
    "avg_if(span.duration,span.op,queue.process)",
    "avg(messaging.message.receive.latency)",
    "trace_status_rate(ok)",
    "time_spent_percentage(app,span.duration)",
];

const QUEUE_RENAMES: RenameTable = &[
    ("avg_if(span.duration,span.op,queue.process)", "processing_time_avg"),
    ("avg(messaging.message.receive.latency)", "time_in_queue_avg"),
    ("trace_status_rate(ok)", "success_rate"),
    ("time_spent_percentage(app,span.duration)", "time_percentage"),
];

const DATABASE_FIELDS: &[&str] = &[
    "span.description",
    "avg(span.self_time)",
    "sum(span.self_time)",
    "time_spent_percentage()",
];

const DATABASE_RENAMES: RenameTable = &[
    ("span.description", "query"),
    ("avg(span.self_time)", "time_avg"),
    ("sum(span.self_time)", "time_total"),
    ("time_spent_percentage()", "time_percentage"),
];

/// A family of related metrics fetched with one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Frontend,
    Backend,
    Requests,
    Cache,
    Queue,
    Database,
}

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Frontend => "frontend",
            Facet::Backend => "backend",
            Facet::Requests => "requests",
            Facet::Cache => "cache",
            Facet::Queue => "queue",
            Facet::Database => "database",
        }
    }

    pub fn dataset(&self) -> Dataset {
        match self {
            Facet::Frontend | Facet::Backend => Dataset::Metrics,
            _ => Dataset::SpansMetrics,
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            Facet::Frontend => FRONTEND_QUERY,
            Facet::Backend => "event.type:transaction",
            Facet::Requests => "span.module:http span.op:http.client",
            Facet::Cache => "span.op:[cache.get_item,cache.get]",
            Facet::Queue => "span.op:[queue.process,queue.publish]",
            Facet::Database => "span.module:db has:span.description",
        }
    }

    /// Field expressions requested from the API
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Facet::Frontend => FRONTEND_FIELDS,
            Facet::Backend => BACKEND_FIELDS,
            Facet::Requests => REQUESTS_FIELDS,
            Facet::Cache => CACHE_FIELDS,
            Facet::Queue => QUEUE_FIELDS,
            Facet::Database => DATABASE_FIELDS,
        }
    }

    /// Fields kept after normalization, with their short keys
    pub fn renames(&self) -> RenameTable {
        match self {
            Facet::Frontend => FRONTEND_RENAMES,
            Facet::Backend => BACKEND_RENAMES,
            Facet::Requests => REQUESTS_RENAMES,
            Facet::Cache => CACHE_RENAMES,
            Facet::Queue => QUEUE_RENAMES,
            Facet::Database => DATABASE_RENAMES,
        }
    }

    pub fn sort(&self) -> Option<&'static str> {
        match self {
            Facet::Cache | Facet::Database => Some("-time_spent_percentage()"),
            Facet::Queue => Some("-time_spent_percentage(app,span.duration)"),
            _ => None,
        }
    }

    pub fn per_page(&self) -> Option<u32> {
        match self {
            Facet::Cache | Facet::Queue | Facet::Database => Some(FACET_PAGE_SIZE),
            _ => None,
        }
    }

    /// Build the query for one project of `org_slug`
    pub fn events_query(&self, org_slug: &str, project_id: &str, environment: &str) -> EventsQuery {
        EventsQuery {
            path: events_path(org_slug),
            project_id: project_id.to_string(),
            environment: environment.to_string(),
            dataset: self.dataset(),
            query: self.query(),
            fields: self.fields(),
            sort: self.sort(),
            per_page: self.per_page(),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
