//! Type-safe cache key builder with versioning

use crate::core::constants::CACHE_KEY_VERSION;

/// Type-safe cache key builder
///
/// All keys are prefixed with a version (e.g., "v1:") to allow
/// invalidating all cached data on schema changes.
pub struct CacheKey;

impl CacheKey {
    // =========================================================================
    // API responses
    // =========================================================================

    /// Cache key for a GET response of the upstream API
    ///
    /// Hashes URL, query parameters and request headers. Parameters are
    /// ordered by name (repeated names keep their relative order) and header
    /// names are case-insensitive, so equivalent requests share a key.
    /// Header values never appear in the key in clear text.
    pub fn api_response(
        url: &str,
        params: &[(String, String)],
        headers: &[(&str, &str)],
    ) -> String {
        let mut params: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(b.0));

        let mut headers: Vec<(String, &str)> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), *v))
            .collect();
        headers.sort();

        let material = serde_json::json!([url, params, headers]).to_string();
        format!(
            "{}:api:{:x}",
            CACHE_KEY_VERSION,
            md5::compute(material.as_bytes())
        )
    }

    /// Pattern matching every cached API response
    pub fn api_responses_pattern() -> String {
        format!("{}:api:*", CACHE_KEY_VERSION)
    }
}
