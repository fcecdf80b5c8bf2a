// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Zentry";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "zentry";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".zentry";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "zentry.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "ZENTRY_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "ZENTRY_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "ZENTRY_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "ZENTRY_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5001;

/// Graceful shutdown timeout for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Environment Variables - Sentry API
// =============================================================================

/// Base URL of the Sentry API
pub const ENV_SENTRY_BASE_URL: &str = "SENTRY_API_BASE_URL";

/// Bearer token for the Sentry API (required)
pub const ENV_SENTRY_AUTH_TOKEN: &str = "SENTRY_API_AUTH_TOKEN";

/// Organization slug the projects belong to (required)
pub const ENV_SENTRY_ORG_SLUG: &str = "SENTRY_ORG_SLUG";

/// Frontend project id (required)
pub const ENV_SENTRY_FRONTEND_PROJECT: &str = "SENTRY_FRONTEND_PROJECT_ID";

/// Frontend environment name (required)
pub const ENV_SENTRY_FRONTEND_ENVIRONMENT: &str = "SENTRY_FRONTEND_ENVIRONMENT";

/// Backend project id (required)
pub const ENV_SENTRY_BACKEND_PROJECT: &str = "SENTRY_BACKEND_PROJECT_ID";

/// Backend environment name (required)
pub const ENV_SENTRY_BACKEND_ENVIRONMENT: &str = "SENTRY_BACKEND_ENVIRONMENT";

/// Referrer tag attached to every events query
pub const ENV_REFERRER: &str = "REFERRER";

/// Length of the reporting window in days
pub const ENV_LOOKBACK_DAYS: &str = "ZENTRY_LOOKBACK_DAYS";

/// Timeout for a single outbound API call
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ZENTRY_REQUEST_TIMEOUT_SECS";

// =============================================================================
// Sentry API Defaults
// =============================================================================

/// Default Sentry API base URL
pub const DEFAULT_SENTRY_BASE_URL: &str = "https://sentry.io/api/0";

/// Default referrer tag
pub const DEFAULT_REFERRER: &str = "zentry";

/// Default reporting window length in days
pub const DEFAULT_LOOKBACK_DAYS: u32 = 3;

/// Default timeout for one outbound API call
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Rows requested for the list-style facets (cache, queue, database)
pub const FACET_PAGE_SIZE: u32 = 5;

// =============================================================================
// Cache
// =============================================================================

/// Environment variable for cache backend (memory or redis)
pub const ENV_CACHE_BACKEND: &str = "ZENTRY_CACHE_BACKEND";

/// Environment variable for in-memory cache capacity
pub const ENV_CACHE_MAX_ENTRIES: &str = "ZENTRY_CACHE_MAX_ENTRIES";

/// Environment variable for the Redis connection URL
///
/// Formats: `redis://host:port/db`, `redis+sentinel://s1:port,s2:port/master/db`
pub const ENV_CACHE_REDIS_URL: &str = "ZENTRY_REDIS_URL";

/// Default in-memory cache capacity
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Cache key version prefix. Bump to orphan every cached entry.
pub const CACHE_KEY_VERSION: &str = "v1";

/// TTL for cached API responses (1 hour)
pub const CACHE_TTL_API_RESPONSE: u64 = 3600;
