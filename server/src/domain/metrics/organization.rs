//! Organization metadata for the dashboard header and deep links

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use super::query::project_path;
use crate::core::config::{ProjectConfig, SentryConfig};
use crate::data::sentry::{FetchError, SentryClient};

#[derive(Debug, Deserialize)]
struct ProjectDetails {
    organization: OrganizationDetails,
}

#[derive(Debug, Deserialize)]
struct OrganizationDetails {
    name: String,
    #[serde(default)]
    links: Option<OrganizationLinks>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationLinks {
    organization_url: Option<String>,
}

/// A monitored project and the web UI of the organization owning it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLink {
    pub id: String,
    pub org_url: Option<String>,
}

impl ProjectLink {
    /// Deep link to `page` filtered to this project, if the org URL is known
    pub fn url(&self, page: &str) -> Option<String> {
        self.org_url.as_ref().map(|base| {
            format!(
                "{}/{}?project={}",
                base.trim_end_matches('/'),
                page.trim_start_matches('/'),
                self.id
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMetadata {
    pub name: String,
    pub frontend: ProjectLink,
    pub backend: ProjectLink,
}

impl OrgMetadata {
    /// Header data when the projects endpoint is unavailable
    pub fn fallback(config: &SentryConfig) -> Self {
        Self {
            name: config.org_slug.clone(),
            frontend: ProjectLink {
                id: config.frontend.id.clone(),
                org_url: None,
            },
            backend: ProjectLink {
                id: config.backend.id.clone(),
                org_url: None,
            },
        }
    }
}

/// Display name for the organizations owning the two projects
pub fn display_name(frontend_org: &str, backend_org: &str) -> String {
    if frontend_org == backend_org {
        frontend_org.to_string()
    } else {
        format!("{frontend_org} / {backend_org}")
    }
}

/// Lazily populated single-slot cache of [`OrgMetadata`]
///
/// Concurrent first callers may both fetch; they write the same value.
#[derive(Debug, Default)]
pub struct OrgDirectory {
    slot: RwLock<Option<Arc<OrgMetadata>>>,
}

impl OrgDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata, without fetching
    pub fn cached(&self) -> Option<Arc<OrgMetadata>> {
        self.slot.read().clone()
    }

    /// Return cached metadata, fetching both projects on first use
    pub async fn get(
        &self,
        client: &SentryClient,
        config: &SentryConfig,
    ) -> Result<Arc<OrgMetadata>, FetchError> {
        if let Some(meta) = self.cached() {
            return Ok(meta);
        }

        let (frontend, backend) = tokio::try_join!(
            fetch_project(client, &config.org_slug, &config.frontend),
            fetch_project(client, &config.org_slug, &config.backend),
        )?;

        let meta = Arc::new(OrgMetadata {
            name: display_name(&frontend.organization.name, &backend.organization.name),
            frontend: ProjectLink {
                id: config.frontend.id.clone(),
                org_url: frontend.organization.links.and_then(|l| l.organization_url),
            },
            backend: ProjectLink {
                id: config.backend.id.clone(),
                org_url: backend.organization.links.and_then(|l| l.organization_url),
            },
        });

        tracing::debug!(name = %meta.name, "Organization metadata loaded");
        *self.slot.write() = Some(meta.clone());
        Ok(meta)
    }

    /// Forget cached metadata; the next `get` fetches again
    pub fn reset(&self) {
        *self.slot.write() = None;
    }
}

async fn fetch_project(
    client: &SentryClient,
    org_slug: &str,
    project: &ProjectConfig,
) -> Result<ProjectDetails, FetchError> {
    client
        .get_json(&project_path(org_slug, &project.id), &[])
        .await
}
