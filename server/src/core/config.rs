use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CACHE_TTL_API_RESPONSE, CONFIG_FILE_NAME, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_HOST, DEFAULT_LOOKBACK_DAYS, DEFAULT_PORT, DEFAULT_REFERRER,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SENTRY_BASE_URL, ENV_CACHE_REDIS_URL,
    ENV_SENTRY_AUTH_TOKEN, ENV_SENTRY_BACKEND_ENVIRONMENT, ENV_SENTRY_BACKEND_PROJECT,
    ENV_SENTRY_FRONTEND_ENVIRONMENT, ENV_SENTRY_FRONTEND_PROJECT, ENV_SENTRY_ORG_SLUG,
};

// =============================================================================
// Cache Backend Enum
// =============================================================================

/// Cache backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for CacheBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackendType::Memory => write!(f, "memory"),
            CacheBackendType::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// One monitored project (nested under sentry)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProjectFileConfig {
    pub id: Option<String>,
    pub environment: Option<String>,
}

/// Sentry API configuration section
#[derive(Default, Clone, Deserialize)]
pub struct SentryFileConfig {
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub org_slug: Option<String>,
    pub frontend: Option<ProjectFileConfig>,
    pub backend: Option<ProjectFileConfig>,
    pub referrer: Option<String>,
    pub lookback_days: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

impl fmt::Debug for SentryFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryFileConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("org_slug", &self.org_slug)
            .field("frontend", &self.frontend)
            .field("backend", &self.backend)
            .field("referrer", &self.referrer)
            .field("lookback_days", &self.lookback_days)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Redis cache configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RedisFileConfig {
    /// Connection URL for Redis-compatible backends
    pub url: Option<String>,
}

/// Response cache configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CacheFileConfig {
    pub backend: Option<CacheBackendType>,
    /// Maximum number of entries (memory backend)
    pub max_entries: Option<u64>,
    /// Lifetime of a cached API response in seconds
    pub ttl_secs: Option<u64>,
    pub redis: Option<RedisFileConfig>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub sentry: Option<SentryFileConfig>,
    pub cache: Option<CacheFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `target` when `value` is set
fn merge_field<T>(target: &mut Option<T>, value: Option<T>, field: &str) {
    if value.is_some() {
        tracing::trace!(field, "Merging config field");
        *target = value;
    }
}

fn merge_project(
    target: &mut Option<ProjectFileConfig>,
    other: Option<ProjectFileConfig>,
    name: &str,
) {
    if let Some(project) = other {
        let current = target.get_or_insert_with(ProjectFileConfig::default);
        merge_field(&mut current.id, project.id, &format!("sentry.{name}.id"));
        merge_field(
            &mut current.environment,
            project.environment,
            &format!("sentry.{name}.environment"),
        );
    }
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_field(&mut current.host, server.host, "server.host");
            merge_field(&mut current.port, server.port, "server.port");
        }

        // Sentry (with nested projects)
        if let Some(sentry) = other.sentry {
            let current = self.sentry.get_or_insert_with(SentryFileConfig::default);
            merge_field(&mut current.base_url, sentry.base_url, "sentry.base_url");
            merge_field(&mut current.auth_token, sentry.auth_token, "sentry.auth_token");
            merge_field(&mut current.org_slug, sentry.org_slug, "sentry.org_slug");
            merge_project(&mut current.frontend, sentry.frontend, "frontend");
            merge_project(&mut current.backend, sentry.backend, "backend");
            merge_field(&mut current.referrer, sentry.referrer, "sentry.referrer");
            merge_field(
                &mut current.lookback_days,
                sentry.lookback_days,
                "sentry.lookback_days",
            );
            merge_field(
                &mut current.request_timeout_secs,
                sentry.request_timeout_secs,
                "sentry.request_timeout_secs",
            );
        }

        // Cache (with nested redis)
        if let Some(cache) = other.cache {
            let current = self.cache.get_or_insert_with(CacheFileConfig::default);
            merge_field(&mut current.backend, cache.backend, "cache.backend");
            merge_field(&mut current.max_entries, cache.max_entries, "cache.max_entries");
            merge_field(&mut current.ttl_secs, cache.ttl_secs, "cache.ttl_secs");
            if let Some(redis) = cache.redis {
                let current_redis = current.redis.get_or_insert_with(RedisFileConfig::default);
                merge_field(&mut current_redis.url, redis.url, "cache.redis.url");
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// A monitored project and the environment to report on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub id: String,
    pub environment: String,
}

/// Sentry API access (final/runtime)
#[derive(Clone)]
pub struct SentryConfig {
    pub base_url: String,
    pub auth_token: String,
    pub org_slug: String,
    pub frontend: ProjectConfig,
    pub backend: ProjectConfig,
    /// Tag attached to every events query
    pub referrer: String,
    /// Length of the current and comparison windows
    pub lookback_days: u32,
    /// Timeout of one outbound call
    pub request_timeout: Duration,
}

impl fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &"<redacted>")
            .field("org_slug", &self.org_slug)
            .field("frontend", &self.frontend)
            .field("backend", &self.backend)
            .field("referrer", &self.referrer)
            .field("lookback_days", &self.lookback_days)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Cache configuration (used internally by CacheService)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache backend type
    pub backend: CacheBackendType,
    /// Maximum entries (memory backend)
    pub max_entries: u64,
    /// Redis URL (redis backend)
    pub redis_url: Option<String>,
    /// Lifetime of a cached API response
    pub ttl: Duration,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sentry: SentryConfig,
    pub cache: CacheConfig,
}

/// A setting that has no default
struct Required<'a> {
    value: Option<String>,
    key: &'a str,
    flag: &'a str,
    env: &'a str,
}

impl Required<'_> {
    fn resolve(self) -> Result<String> {
        match self.value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => anyhow::bail!(
                "Configuration error: {} is required. Set the {} env var, pass --{}, \
                 or set {} in the config file.",
                self.key,
                self.env,
                self.flag,
                self.key
            ),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.zentry/zentry.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.zentry/zentry.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        // 3. Extract file config values with defaults
        let file_server = file_config.server.unwrap_or_default();
        let file_sentry = file_config.sentry.unwrap_or_default();
        let file_frontend = file_sentry.frontend.unwrap_or_default();
        let file_backend = file_sentry.backend.unwrap_or_default();
        let file_cache = file_config.cache.unwrap_or_default();
        let file_redis = file_cache.redis.unwrap_or_default();

        // 4. Layer configs: defaults -> file config -> CLI/env overrides
        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let base_url = cli
            .sentry_base_url
            .clone()
            .or(file_sentry.base_url)
            .unwrap_or_else(|| DEFAULT_SENTRY_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let auth_token = Required {
            value: cli.sentry_token.clone().or(file_sentry.auth_token),
            key: "sentry.auth_token",
            flag: "sentry-token",
            env: ENV_SENTRY_AUTH_TOKEN,
        }
        .resolve()?;

        let org_slug = Required {
            value: cli.org_slug.clone().or(file_sentry.org_slug),
            key: "sentry.org_slug",
            flag: "org-slug",
            env: ENV_SENTRY_ORG_SLUG,
        }
        .resolve()?;

        let frontend = ProjectConfig {
            id: Required {
                value: cli.frontend_project.clone().or(file_frontend.id),
                key: "sentry.frontend.id",
                flag: "frontend-project",
                env: ENV_SENTRY_FRONTEND_PROJECT,
            }
            .resolve()?,
            environment: Required {
                value: cli.frontend_environment.clone().or(file_frontend.environment),
                key: "sentry.frontend.environment",
                flag: "frontend-environment",
                env: ENV_SENTRY_FRONTEND_ENVIRONMENT,
            }
            .resolve()?,
        };

        let backend = ProjectConfig {
            id: Required {
                value: cli.backend_project.clone().or(file_backend.id),
                key: "sentry.backend.id",
                flag: "backend-project",
                env: ENV_SENTRY_BACKEND_PROJECT,
            }
            .resolve()?,
            environment: Required {
                value: cli.backend_environment.clone().or(file_backend.environment),
                key: "sentry.backend.environment",
                flag: "backend-environment",
                env: ENV_SENTRY_BACKEND_ENVIRONMENT,
            }
            .resolve()?,
        };

        let referrer = cli
            .referrer
            .clone()
            .or(file_sentry.referrer)
            .unwrap_or_else(|| DEFAULT_REFERRER.to_string());

        let lookback_days = cli
            .lookback_days
            .or(file_sentry.lookback_days)
            .unwrap_or(DEFAULT_LOOKBACK_DAYS);

        let request_timeout_secs = cli
            .request_timeout
            .or(file_sentry.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        // cache config: CLI/env overrides file config
        let cache = CacheConfig {
            backend: cli.cache_backend.or(file_cache.backend).unwrap_or_default(),
            max_entries: cli
                .cache_max_entries
                .or(file_cache.max_entries)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            redis_url: cli.cache_redis_url.clone().or(file_redis.url),
            ttl: Duration::from_secs(file_cache.ttl_secs.unwrap_or(CACHE_TTL_API_RESPONSE)),
        };

        let config = Self {
            server: ServerConfig { host, port },
            sentry: SentryConfig {
                base_url,
                auth_token,
                org_slug,
                frontend,
                backend,
                referrer,
                lookback_days,
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
            cache,
        };

        // Validate configuration
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            base_url = %config.sentry.base_url,
            org_slug = %config.sentry.org_slug,
            frontend_project = %config.sentry.frontend.id,
            backend_project = %config.sentry.backend.id,
            lookback_days = config.sentry.lookback_days,
            request_timeout_secs = config.sentry.request_timeout.as_secs(),
            cache_backend = %config.cache.backend,
            cache_max_entries = config.cache.max_entries,
            cache_ttl_secs = config.cache.ttl.as_secs(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        // Host must not be empty
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port must be non-zero (port 0 would cause bind failure)
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if !(self.sentry.base_url.starts_with("http://")
            || self.sentry.base_url.starts_with("https://"))
        {
            anyhow::bail!(
                "Configuration error: sentry.base_url must start with http:// or https:// (got '{}')",
                self.sentry.base_url
            );
        }

        if self.sentry.lookback_days == 0 {
            anyhow::bail!("Configuration error: sentry.lookback_days must be greater than 0");
        }

        if self.sentry.request_timeout.is_zero() {
            anyhow::bail!(
                "Configuration error: sentry.request_timeout_secs must be greater than 0"
            );
        }

        if self.cache.ttl.is_zero() {
            anyhow::bail!("Configuration error: cache.ttl_secs must be greater than 0");
        }

        match self.cache.backend {
            CacheBackendType::Memory if self.cache.max_entries == 0 => {
                anyhow::bail!("Configuration error: cache.max_entries must be greater than 0");
            }
            CacheBackendType::Redis
                if self.cache.redis_url.as_deref().is_none_or(str::is_empty) =>
            {
                anyhow::bail!(
                    "Configuration error: Redis URL required when cache.backend is 'redis'. \
                     Set via {} env var, --cache-redis-url, or cache.redis.url in config file.",
                    ENV_CACHE_REDIS_URL
                );
            }
            _ => {}
        }

        Ok(())
    }
}

/// Get the profile config path (~/.zentry/zentry.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
