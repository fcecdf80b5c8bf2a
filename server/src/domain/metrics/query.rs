//! Events API query construction

use std::fmt;

use super::window::TimeWindow;

/// Dataset an events query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Metrics,
    SpansMetrics,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Metrics => "metrics",
            Dataset::SpansMetrics => "spansMetrics",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path of the organization events endpoint
pub fn events_path(org_slug: &str) -> String {
    format!("/organizations/{org_slug}/events/")
}

/// Path of the project details endpoint
pub fn project_path(org_slug: &str, project_id: &str) -> String {
    format!("/projects/{org_slug}/{project_id}/")
}

/// One events query, built per fetch call
#[derive(Debug, Clone, PartialEq)]
pub struct EventsQuery {
    pub path: String,
    pub project_id: String,
    pub environment: String,
    pub dataset: Dataset,
    pub query: &'static str,
    pub fields: &'static [&'static str],
    pub sort: Option<&'static str>,
    pub per_page: Option<u32>,
}

impl EventsQuery {
    /// Query parameters for `window`.
    ///
    /// Base params (`referrer`, `start`, `end`) come first, then the facet
    /// params. `field` is repeated once per requested expression.
    pub fn params(&self, window: &TimeWindow, referrer: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("referrer".to_string(), referrer.to_string()),
            ("start".to_string(), window.start_param()),
            ("end".to_string(), window.end_param()),
            ("project".to_string(), self.project_id.clone()),
            ("environment".to_string(), self.environment.clone()),
            ("dataset".to_string(), self.dataset.as_str().to_string()),
        ];

        if let Some(per_page) = self.per_page {
            params.push(("per_page".to_string(), per_page.to_string()));
        }

        params.push(("query".to_string(), self.query.to_string()));
        params.extend(
            self.fields
                .iter()
                .map(|field| ("field".to_string(), (*field).to_string())),
        );

        if let Some(sort) = self.sort {
            params.push(("sort".to_string(), sort.to_string()));
        }

        params
    }
}
