//! Metric fetchers
//!
//! [`MetricsContext`] carries everything a fetch needs: the API client, the
//! clock, the connection settings and the organization metadata slot. One
//! context is shared by all request handlers.

use std::sync::Arc;

use super::facets::Facet;
use super::normalize::{MetricRecord, Normalized, RawMetricResponse, normalize_all, normalize_first};
use super::organization::{OrgDirectory, OrgMetadata};
use super::window::{Clock, Period, TimeWindow, compute_window};
use crate::core::config::{ProjectConfig, SentryConfig};
use crate::data::sentry::{FetchError, SentryClient};

/// Current and previous window results of one facet
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub current: Normalized<MetricRecord>,
    pub previous: Normalized<MetricRecord>,
}

/// One row of the database facet
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStat {
    pub query: String,
    pub time_avg: f64,
    pub time_total: f64,
    pub time_percentage: f64,
}

impl QueryStat {
    fn from_record(path: &str, record: &MetricRecord) -> Result<Self, FetchError> {
        let number = |key: &str| {
            record
                .number(key)
                .ok_or_else(|| FetchError::malformed(path, format!("query record missing `{key}`")))
        };

        Ok(Self {
            query: record
                .text("query")
                .ok_or_else(|| FetchError::malformed(path, "query record missing `query`"))?
                .to_string(),
            time_avg: number("time_avg")?,
            time_total: number("time_total")?,
            time_percentage: number("time_percentage")?,
        })
    }
}

pub struct MetricsContext {
    client: Arc<SentryClient>,
    clock: Arc<dyn Clock>,
    config: SentryConfig,
    orgs: OrgDirectory,
}

impl std::fmt::Debug for MetricsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsContext")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish()
    }
}

impl MetricsContext {
    pub fn new(client: Arc<SentryClient>, clock: Arc<dyn Clock>, config: SentryConfig) -> Self {
        Self {
            client,
            clock,
            config,
            orgs: OrgDirectory::new(),
        }
    }

    pub fn config(&self) -> &SentryConfig {
        &self.config
    }

    /// Window for `period` as of now
    pub fn window(&self, period: Period) -> TimeWindow {
        compute_window(self.clock.now(), self.config.lookback_days, period)
    }

    async fn fetch_raw(
        &self,
        facet: Facet,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<RawMetricResponse, FetchError> {
        let request = facet.events_query(&self.config.org_slug, &project.id, &project.environment);
        let params = request.params(&self.window(period), &self.config.referrer);
        let raw: RawMetricResponse = self.client.get_json(&request.path, &params).await?;

        tracing::debug!(
            facet = %facet,
            project = %project.id,
            ?period,
            rows = raw.data.len(),
            "Facet fetched"
        );
        Ok(raw)
    }

    /// Fetch a single-record facet
    pub async fn fetch_record(
        &self,
        facet: Facet,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<Normalized<MetricRecord>, FetchError> {
        let raw = self.fetch_raw(facet, project, period).await?;
        Ok(normalize_first(&raw, facet.renames()))
    }

    /// Fetch the current and previous windows of a facet concurrently
    pub async fn fetch_comparison(
        &self,
        facet: Facet,
        project: &ProjectConfig,
    ) -> Result<Comparison, FetchError> {
        let (current, previous) = tokio::try_join!(
            self.fetch_record(facet, project, Period::Current),
            self.fetch_record(facet, project, Period::Previous),
        )?;
        Ok(Comparison { current, previous })
    }

    // Per-facet entry points for a single window. Panels compare both windows
    // through `fetch_comparison`, which runs the same `fetch_record` per facet.

    /// p75 web vitals and their performance scores
    pub async fn fetch_frontend(
        &self,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<Normalized<MetricRecord>, FetchError> {
        self.fetch_record(Facet::Frontend, project, period).await
    }

    /// Transaction failure rate and apdex
    pub async fn fetch_backend(
        &self,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<Normalized<MetricRecord>, FetchError> {
        self.fetch_record(Facet::Backend, project, period).await
    }

    /// Outbound HTTP response rates and average duration
    pub async fn fetch_requests(
        &self,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<Normalized<MetricRecord>, FetchError> {
        self.fetch_record(Facet::Requests, project, period).await
    }

    /// Cache miss rate
    pub async fn fetch_cache(
        &self,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<Normalized<MetricRecord>, FetchError> {
        self.fetch_record(Facet::Cache, project, period).await
    }

    /// Queue processing time, receive latency and success rate
    pub async fn fetch_queue(
        &self,
        project: &ProjectConfig,
        period: Period,
    ) -> Result<Normalized<MetricRecord>, FetchError> {
        self.fetch_record(Facet::Queue, project, period).await
    }

    /// Most time-consuming queries of the current window, in API order
    pub async fn fetch_database(
        &self,
        project: &ProjectConfig,
    ) -> Result<Normalized<Vec<QueryStat>>, FetchError> {
        let facet = Facet::Database;
        let raw = self.fetch_raw(facet, project, Period::Current).await?;

        match normalize_all(&raw, facet.renames()) {
            Normalized::NoData => Ok(Normalized::NoData),
            Normalized::Data(records) => {
                let path = facet
                    .events_query(&self.config.org_slug, &project.id, &project.environment)
                    .path;
                let stats = records
                    .iter()
                    .map(|record| QueryStat::from_record(&path, record))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Normalized::Data(stats))
            }
        }
    }

    /// Organization metadata, degrading to the configured slug on failure
    pub async fn organization(&self) -> Arc<OrgMetadata> {
        match self.orgs.get(&self.client, &self.config).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load organization metadata");
                Arc::new(OrgMetadata::fallback(&self.config))
            }
        }
    }

    /// Drop cached organization metadata
    pub fn reset_organization(&self) {
        self.orgs.reset();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::context;
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const CURRENT_START: &str = "2024-05-07T23:59:59.999999+00:00";
    const CURRENT_END: &str = "2024-05-10T23:59:59.999999+00:00";
    const PREVIOUS_START: &str = "2024-05-04T23:59:59.999999+00:00";

    #[tokio::test]
    async fn test_fetch_backend_renames_fields() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organizations/acme/events/")
                    .query_param("project", "22")
                    .query_param("environment", "staging")
                    .query_param("dataset", "metrics")
                    .query_param("query", "event.type:transaction")
                    .query_param("start", CURRENT_START)
                    .query_param("end", CURRENT_END)
                    .query_param("referrer", "zentry");
                then.status(200).json_body(json!({
                    "data": [{ "failure_rate()": 0.01, "apdex()": 0.93, "count()": 10 }],
                    "meta": {}
                }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let backend = ctx.config().backend.clone();
        let result = ctx.fetch_backend(&backend, Period::Current).await.unwrap();

        let record = result.data().unwrap();
        assert_eq!(record.number("failure_rate"), Some(0.01));
        assert_eq!(record.number("apdex"), Some(0.93));
        assert_eq!(record.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_data_is_no_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let frontend = ctx.config().frontend.clone();

        assert!(ctx.fetch_frontend(&frontend, Period::Current).await.unwrap().is_no_data());
        assert!(ctx.fetch_database(&frontend).await.unwrap().is_no_data());
    }

    #[tokio::test]
    async fn test_missing_data_array_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(200).json_body(json!({ "detail": "nope" }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let backend = ctx.config().backend.clone();
        let err = ctx.fetch_cache(&backend, Period::Current).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_comparison_queries_both_windows() {
        let server = MockServer::start_async().await;
        let current = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organizations/acme/events/")
                    .query_param("start", CURRENT_START);
                then.status(200)
                    .json_body(json!({ "data": [{ "cache_miss_rate()": 0.2 }] }));
            })
            .await;
        let previous = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organizations/acme/events/")
                    .query_param("start", PREVIOUS_START)
                    .query_param("end", CURRENT_START);
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let backend = ctx.config().backend.clone();
        let cmp = ctx.fetch_comparison(Facet::Cache, &backend).await.unwrap();

        assert_eq!(cmp.current.data().unwrap().number("miss_rate"), Some(0.2));
        assert!(cmp.previous.is_no_data());
        current.assert_async().await;
        previous.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_comparison_propagates_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(502);
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let backend = ctx.config().backend.clone();
        let err = ctx
            .fetch_comparison(Facet::Queue, &backend)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_fetch_requests_params() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organizations/acme/events/")
                    .query_param("project", "11")
                    .query_param("dataset", "spansMetrics")
                    .query_param("field", "http_response_rate(5)")
                    .query_param("field", "avg(span.self_time)");
                then.status(200).json_body(json!({
                    "data": [{
                        "http_response_rate(3)": 0.0,
                        "http_response_rate(4)": 0.01,
                        "http_response_rate(5)": 0.002,
                        "avg(span.self_time)": 310.5
                    }]
                }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let frontend = ctx.config().frontend.clone();
        let result = ctx.fetch_requests(&frontend, Period::Current).await.unwrap();

        let record = result.data().unwrap();
        assert_eq!(record.number("response_rate_4xx"), Some(0.01));
        assert_eq!(record.number("time_avg"), Some(310.5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_database_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organizations/acme/events/")
                    .query_param("per_page", "5")
                    .query_param("sort", "-time_spent_percentage()");
                then.status(200).json_body(json!({
                    "data": [
                        {
                            "span.description": "SELECT * FROM users WHERE id = %s",
                            "avg(span.self_time)": 12.5,
                            "sum(span.self_time)": 90000.0,
                            "time_spent_percentage()": 0.4
                        },
                        {
                            "span.description": "UPDATE sessions SET seen = %s",
                            "avg(span.self_time)": 3.0,
                            "sum(span.self_time)": 1500.0,
                            "time_spent_percentage()": 0.1
                        }
                    ]
                }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let backend = ctx.config().backend.clone();
        let rows = ctx
            .fetch_database(&backend)
            .await
            .unwrap()
            .into_data()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].query, "SELECT * FROM users WHERE id = %s");
        assert_eq!(rows[0].time_total, 90000.0);
        assert_eq!(rows[1].time_percentage, 0.1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_database_missing_field_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(200).json_body(json!({
                    "data": [{ "span.description": "SELECT 1", "avg(span.self_time)": 1.0 }]
                }));
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let backend = ctx.config().backend.clone();
        let err = ctx.fetch_database(&backend).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_organization_degrades_to_slug() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/projects/acme/11/");
                then.status(500);
            })
            .await;

        let ctx = context(&server.base_url()).await;
        let org = ctx.organization().await;
        assert_eq!(org.name, "acme");
        assert_eq!(org.frontend.org_url, None);

        ctx.reset_organization();
    }
}
