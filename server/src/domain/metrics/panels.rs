//! Dashboard panels
//!
//! A panel turns one facet's normalized data into display-ready cards:
//! formatted values, change versus the previous window, and a score.
//! Panels fail independently; a fetch error only affects its own panel.

use futures::future::join_all;

use super::facets::Facet;
use super::fetch::{MetricsContext, QueryStat};
use super::format::{fmt_duration, fmt_percentage, fmt_percentage_signed, fmt_round_2};
use super::normalize::{MetricRecord, Normalized};
use super::organization::{OrgMetadata, ProjectLink};
use super::score::{Score, keys, score};
use crate::core::config::{ProjectConfig, SentryConfig};
use crate::data::sentry::FetchError;
use crate::utils::string::{Fragment, highlight_keywords};

/// Keywords emphasised in database query text
pub const SQL_KEYWORDS: &[&str] = &[
    "AND", "DELETE", "FROM", "LIMIT", "OR", "ORDER BY", "SELECT", "SET", "UPDATE", "WHERE",
];

const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Frontend,
    Backend,
    FrontendRequests,
    BackendRequests,
    Caches,
    Queues,
    Database,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::FrontendRequests,
        Panel::Frontend,
        Panel::BackendRequests,
        Panel::Backend,
        Panel::Caches,
        Panel::Queues,
        Panel::Database,
    ];

    /// Path segment under `/status/`
    pub fn slug(&self) -> &'static str {
        match self {
            Panel::Frontend => "frontend",
            Panel::Backend => "backend",
            Panel::FrontendRequests => "frontend_requests",
            Panel::BackendRequests => "backend_requests",
            Panel::Caches => "caches",
            Panel::Queues => "queues",
            Panel::Database => "database",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == slug)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Panel::Frontend => "Frontend",
            Panel::Backend => "Backend",
            Panel::FrontendRequests | Panel::BackendRequests => "Outbound API Requests",
            Panel::Caches => "Caches",
            Panel::Queues => "Queues",
            Panel::Database => "Database",
        }
    }

    /// HTML element id of the panel card
    pub fn element_id(&self) -> &'static str {
        match self {
            Panel::Frontend => "frontend",
            Panel::Backend => "backend",
            Panel::FrontendRequests => "frontend-outbound-requests",
            Panel::BackendRequests => "backend-outbound-requests",
            Panel::Caches => "cache",
            Panel::Queues => "queue",
            Panel::Database => "database",
        }
    }

    /// Fragment route the loading placeholder fetches
    pub fn route(&self) -> String {
        format!("/status/{}", self.slug())
    }

    pub fn facet(&self) -> Facet {
        match self {
            Panel::Frontend => Facet::Frontend,
            Panel::Backend => Facet::Backend,
            Panel::FrontendRequests | Panel::BackendRequests => Facet::Requests,
            Panel::Caches => Facet::Cache,
            Panel::Queues => Facet::Queue,
            Panel::Database => Facet::Database,
        }
    }

    fn is_frontend(&self) -> bool {
        matches!(self, Panel::Frontend | Panel::FrontendRequests)
    }

    /// Project whose data the panel shows
    pub fn project<'a>(&self, config: &'a SentryConfig) -> &'a ProjectConfig {
        if self.is_frontend() {
            &config.frontend
        } else {
            &config.backend
        }
    }

    fn insights_page(&self) -> &'static str {
        match self {
            Panel::Frontend => "/insights/browser/pageloads/",
            Panel::Backend => "/performance/",
            Panel::FrontendRequests | Panel::BackendRequests => "/insights/http/",
            Panel::Caches => "/insights/caches/",
            Panel::Queues => "/insights/queues/",
            Panel::Database => "/insights/database/",
        }
    }

    /// "Dig deeper" link into the product UI
    pub fn link(&self, org: &OrgMetadata) -> Option<String> {
        let project: &ProjectLink = if self.is_frontend() {
            &org.frontend
        } else {
            &org.backend
        };
        project.url(self.insights_page())
    }
}

/// Relative change versus the previous window
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub ratio: f64,
}

impl Change {
    /// `(previous - current) / previous`; `None` when there is no usable baseline
    pub fn between(current: f64, previous: Option<f64>) -> Option<Self> {
        match previous {
            Some(prev) if prev != 0.0 && prev.is_finite() && current.is_finite() => Some(Self {
                ratio: (prev - current) / prev,
            }),
            _ => None,
        }
    }

    pub fn text(&self) -> String {
        fmt_percentage_signed(self.ratio)
    }

    pub fn css_class(&self) -> &'static str {
        if self.ratio >= 0.0 { "up" } else { "down" }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub id: &'static str,
    pub title: &'static str,
    pub value: String,
    pub change: Option<Change>,
    pub score: Option<Score>,
}

/// One database query row
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub fragments: Vec<Fragment>,
    pub time_avg: String,
    pub time_total: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Loading,
    NoData,
    Failed,
    Metrics(Vec<MetricCard>),
    Queries(Vec<QueryRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub panel: Panel,
    pub link: Option<String>,
    pub body: PanelBody,
}

impl PanelView {
    /// Placeholder that loads its content from [`Panel::route`]
    pub fn loading(panel: Panel, org: &OrgMetadata) -> Self {
        Self {
            panel,
            link: panel.link(org),
            body: PanelBody::Loading,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.body, PanelBody::Loading)
    }

    pub fn title(&self) -> &'static str {
        self.panel.title()
    }

    pub fn element_id(&self) -> &'static str {
        self.panel.element_id()
    }

    pub fn route(&self) -> String {
        self.panel.route()
    }
}

struct CardDef {
    id: &'static str,
    title: &'static str,
    value: fn(&MetricRecord) -> Option<f64>,
    score_key: &'static str,
    score_value: fn(&MetricRecord) -> Option<f64>,
    format: fn(f64) -> String,
}

impl CardDef {
    fn build(&self, current: &MetricRecord, previous: Option<&MetricRecord>) -> MetricCard {
        let value = (self.value)(current);
        let previous = previous.and_then(|p| (self.value)(p));

        MetricCard {
            id: self.id,
            title: self.title,
            value: value.map_or_else(|| NOT_AVAILABLE.to_string(), self.format),
            change: value.and_then(|v| Change::between(v, previous)),
            score: (self.score_value)(current).and_then(|v| score(self.score_key, v)),
        }
    }
}

fn http_failure_rate(r: &MetricRecord) -> Option<f64> {
    Some(
        r.number("response_rate_3xx")?
            + r.number("response_rate_4xx")?
            + r.number("response_rate_5xx")?,
    )
}

const FRONTEND_CARDS: &[CardDef] = &[
    CardDef {
        id: "ttfb",
        title: "Time to First Byte",
        value: |r| r.number("ttfb"),
        score_key: keys::TTFB,
        score_value: |r| r.number("ttfb"),
        format: fmt_duration,
    },
    CardDef {
        id: "fcp",
        title: "First Contentful Paint",
        value: |r| r.number("fcp"),
        score_key: keys::FCP,
        score_value: |r| r.number("fcp"),
        format: fmt_duration,
    },
    CardDef {
        id: "inp",
        title: "Interaction to Next Paint",
        value: |r| r.number("inp"),
        score_key: keys::INP,
        score_value: |r| r.number("inp"),
        format: fmt_duration,
    },
];

const BACKEND_CARDS: &[CardDef] = &[
    CardDef {
        id: "failure-rate",
        title: "Failure Rate",
        value: |r| r.number("failure_rate"),
        score_key: keys::BACKEND_FAILURE_RATE,
        score_value: |r| r.number("failure_rate"),
        format: fmt_percentage,
    },
    CardDef {
        id: "apdex",
        title: "Apdex",
        value: |r| r.number("apdex"),
        score_key: keys::INVERSE_APDEX,
        score_value: |r| r.number("apdex").map(|apdex| 1.0 - apdex),
        format: fmt_round_2,
    },
];

const REQUESTS_CARDS: &[CardDef] = &[
    CardDef {
        id: "failure-rate",
        title: "Failure Rate",
        value: http_failure_rate,
        score_key: keys::HTTP_FAILURE_RATE,
        score_value: http_failure_rate,
        format: fmt_percentage,
    },
    CardDef {
        id: "time-avg",
        title: "Avg Duration",
        value: |r| r.number("time_avg"),
        score_key: keys::HTTP_AVG_DURATION,
        score_value: |r| r.number("time_avg"),
        format: fmt_duration,
    },
];

const CACHE_CARDS: &[CardDef] = &[CardDef {
    id: "cache-hit-rate",
    title: "Cache hit rate",
    value: |r| r.number("miss_rate").map(|miss| 1.0 - miss),
    score_key: keys::CACHE_MISS_RATE,
    score_value: |r| r.number("miss_rate"),
    format: fmt_percentage,
}];

const QUEUE_CARDS: &[CardDef] = &[
    CardDef {
        id: "processing-time-avg",
        title: "Avg Processing Time",
        value: |r| r.number("processing_time_avg"),
        score_key: keys::QUEUE_AVG_PROCESSING,
        score_value: |r| r.number("processing_time_avg"),
        format: fmt_duration,
    },
    CardDef {
        id: "time-in-queue-avg",
        title: "Avg Time in Queue",
        value: |r| r.number("time_in_queue_avg"),
        score_key: keys::QUEUE_AVG_TIME_IN_QUEUE,
        score_value: |r| r.number("time_in_queue_avg"),
        format: fmt_duration,
    },
];

fn card_defs(panel: Panel) -> &'static [CardDef] {
    match panel {
        Panel::Frontend => FRONTEND_CARDS,
        Panel::Backend => BACKEND_CARDS,
        Panel::FrontendRequests | Panel::BackendRequests => REQUESTS_CARDS,
        Panel::Caches => CACHE_CARDS,
        Panel::Queues => QUEUE_CARDS,
        Panel::Database => &[],
    }
}

/// Cards for a comparison panel
pub fn metric_cards(
    panel: Panel,
    current: &MetricRecord,
    previous: Option<&MetricRecord>,
) -> Vec<MetricCard> {
    card_defs(panel)
        .iter()
        .map(|def| def.build(current, previous))
        .collect()
}

pub fn query_rows(stats: &[QueryStat]) -> Vec<QueryRow> {
    stats
        .iter()
        .map(|stat| QueryRow {
            fragments: highlight_keywords(&stat.query, SQL_KEYWORDS),
            time_avg: fmt_duration(stat.time_avg),
            time_total: fmt_duration(stat.time_total),
        })
        .collect()
}

async fn load_body(ctx: &MetricsContext, panel: Panel) -> Result<PanelBody, FetchError> {
    let project = panel.project(ctx.config());

    if panel == Panel::Database {
        return Ok(match ctx.fetch_database(project).await? {
            Normalized::NoData => PanelBody::NoData,
            Normalized::Data(stats) => PanelBody::Queries(query_rows(&stats)),
        });
    }

    let comparison = ctx.fetch_comparison(panel.facet(), project).await?;
    Ok(match &comparison.current {
        Normalized::NoData => PanelBody::NoData,
        Normalized::Data(current) => {
            PanelBody::Metrics(metric_cards(panel, current, comparison.previous.data()))
        }
    })
}

/// Fetch and prepare one panel
pub async fn build_panel(ctx: &MetricsContext, org: &OrgMetadata, panel: Panel) -> PanelView {
    let body = match load_body(ctx, panel).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(panel = panel.slug(), error = %e, "Panel failed to load");
            PanelBody::Failed
        }
    };

    PanelView {
        panel,
        link: panel.link(org),
        body,
    }
}

/// Fetch every panel concurrently, in [`Panel::ALL`] order
pub async fn build_all_panels(ctx: &MetricsContext, org: &OrgMetadata) -> Vec<PanelView> {
    join_all(Panel::ALL.into_iter().map(|panel| build_panel(ctx, org, panel))).await
}
