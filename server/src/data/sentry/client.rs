//! Cache-aware client for the Sentry REST API

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::FetchError;
use crate::core::config::SentryConfig;
use crate::data::cache::{CacheKey, CacheService};

const USER_AGENT: &str = concat!("Zentry/", env!("CARGO_PKG_VERSION"));

/// Cached upstream answer. Only 200 responses with a decodable body are stored.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    body: String,
}

/// GET-only JSON client
///
/// Every call consults the response cache first. Cache failures are logged
/// and bypassed; they never fail a request.
pub struct SentryClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
    cache: Arc<CacheService>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for SentryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryClient")
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .finish()
    }
}

impl SentryClient {
    pub fn new(
        config: &SentryConfig,
        cache: Arc<CacheService>,
        cache_ttl: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", config.auth_token),
            cache,
            cache_ttl,
        })
    }

    /// GET `{base_url}{path}` with query `params` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let cache_key = CacheKey::api_response(
            &url,
            params,
            &[(AUTHORIZATION.as_str(), self.auth_header.as_str())],
        );

        if let Some(body) = self.cached_body(&cache_key).await {
            tracing::trace!(path, "API response served from cache");
            return decode(path, &body);
        }

        let request_url = reqwest::Url::parse_with_params(&url, params)
            .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let started = Instant::now();
        let resp = self
            .http
            .get(request_url)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(path, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_transport(path, e))?;

        tracing::debug!(
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API request"
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let value = decode(path, &body)?;
        if status == StatusCode::OK {
            self.store(&cache_key, status, &body).await;
        }

        Ok(value)
    }

    async fn cached_body(&self, key: &str) -> Option<String> {
        match self.cache.get::<CachedResponse>(key).await {
            Ok(Some(cached)) if cached.status == StatusCode::OK.as_u16() => Some(cached.body),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Response cache read failed, bypassing");
                None
            }
        }
    }

    async fn store(&self, key: &str, status: StatusCode, body: &str) {
        let entry = CachedResponse {
            status: status.as_u16(),
            body: body.to_string(),
        };
        if let Err(e) = self.cache.set(key, &entry, Some(self.cache_ttl)).await {
            tracing::warn!(error = %e, "Response cache write failed");
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::malformed(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use serde_json::{Value, json};

    use crate::data::cache::{CacheBackend, CacheError};
    use crate::data::sentry::testing::{memory_cache, sentry_config};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheBackend for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Connection("down".into()))
        }
        async fn set(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            Err(CacheError::Connection("down".into()))
        }
        async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
            Err(CacheError::Connection("down".into()))
        }
        async fn health_check(&self) -> Result<(), CacheError> {
            Err(CacheError::Connection("down".into()))
        }
        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_get_json_sends_auth_and_params() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organizations/acme/events/")
                    .header("authorization", "Bearer test-token")
                    .query_param("referrer", "zentry")
                    .query_param("field", "apdex()")
                    .query_param("field", "failure_rate()");
                then.status(200).json_body(json!({ "data": [{ "apdex()": 0.9 }] }));
            })
            .await;

        let client = SentryClient::new(
            &sentry_config(&server.base_url()),
            memory_cache().await,
            Duration::from_secs(60),
        )
        .unwrap();

        let body: Value = client
            .get_json(
                "/organizations/acme/events/",
                &params(&[
                    ("referrer", "zentry"),
                    ("field", "apdex()"),
                    ("field", "failure_rate()"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(body["data"][0]["apdex()"], json!(0.9));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_json_caches_ok_responses() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let client = SentryClient::new(
            &sentry_config(&server.base_url()),
            memory_cache().await,
            Duration::from_secs(60),
        )
        .unwrap();
        let p = params(&[("project", "22")]);

        for _ in 0..3 {
            let body: Value = client
                .get_json("/organizations/acme/events/", &p)
                .await
                .unwrap();
            assert_eq!(body, json!({ "data": [] }));
        }

        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_get_json_error_status_not_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(500).body("boom");
            })
            .await;

        let client = SentryClient::new(
            &sentry_config(&server.base_url()),
            memory_cache().await,
            Duration::from_secs(60),
        )
        .unwrap();

        for _ in 0..2 {
            let err = client
                .get_json::<Value>("/organizations/acme/events/", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::Status { status: 500, .. }));
        }

        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_get_json_non_200_success_not_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(203).json_body(json!({ "data": [] }));
            })
            .await;

        let client = SentryClient::new(
            &sentry_config(&server.base_url()),
            memory_cache().await,
            Duration::from_secs(60),
        )
        .unwrap();

        for _ in 0..2 {
            client
                .get_json::<Value>("/organizations/acme/events/", &[])
                .await
                .unwrap();
        }

        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_get_json_malformed_body_not_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let client = SentryClient::new(
            &sentry_config(&server.base_url()),
            memory_cache().await,
            Duration::from_secs(60),
        )
        .unwrap();

        for _ in 0..2 {
            let err = client
                .get_json::<Value>("/organizations/acme/events/", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::Malformed { .. }));
        }

        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_get_json_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow/");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({ "data": [] }));
            })
            .await;

        let mut config = sentry_config(&server.base_url());
        config.request_timeout = Duration::from_millis(50);
        let client =
            SentryClient::new(&config, memory_cache().await, Duration::from_secs(60)).unwrap();

        let err = client.get_json::<Value>("/slow/", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_get_json_bypasses_broken_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/organizations/acme/events/");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let cache = Arc::new(CacheService::with_backend(Arc::new(BrokenCache)));
        let client = SentryClient::new(
            &sentry_config(&server.base_url()),
            cache,
            Duration::from_secs(60),
        )
        .unwrap();

        for _ in 0..2 {
            let body: Value = client
                .get_json("/organizations/acme/events/", &[])
                .await
                .unwrap();
            assert_eq!(body, json!({ "data": [] }));
        }
        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/projects/acme/22/");
                then.status(200).json_body(json!({}));
            })
            .await;

        let base = format!("{}/", server.base_url());
        let client =
            SentryClient::new(&sentry_config(&base), memory_cache().await, Duration::from_secs(60))
                .unwrap();

        client
            .get_json::<Value>("/projects/acme/22/", &[])
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
