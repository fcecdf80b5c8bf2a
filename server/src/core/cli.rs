use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::CacheBackendType;
use super::constants::{
    ENV_CACHE_BACKEND, ENV_CACHE_MAX_ENTRIES, ENV_CACHE_REDIS_URL, ENV_CONFIG, ENV_HOST,
    ENV_LOOKBACK_DAYS, ENV_PORT, ENV_REFERRER, ENV_REQUEST_TIMEOUT_SECS, ENV_SENTRY_AUTH_TOKEN,
    ENV_SENTRY_BACKEND_ENVIRONMENT, ENV_SENTRY_BACKEND_PROJECT, ENV_SENTRY_BASE_URL,
    ENV_SENTRY_FRONTEND_ENVIRONMENT, ENV_SENTRY_FRONTEND_PROJECT, ENV_SENTRY_ORG_SLUG,
};

#[derive(Parser)]
#[command(name = "zentry")]
#[command(version, about = "Service health dashboard for Sentry projects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Sentry API options
    /// Sentry API base URL
    #[arg(long, global = true, env = ENV_SENTRY_BASE_URL)]
    pub sentry_base_url: Option<String>,

    /// Sentry API auth token
    #[arg(long, global = true, env = ENV_SENTRY_AUTH_TOKEN, hide_env_values = true)]
    pub sentry_token: Option<String>,

    /// Organization slug
    #[arg(long, global = true, env = ENV_SENTRY_ORG_SLUG)]
    pub org_slug: Option<String>,

    /// Frontend project id
    #[arg(long, global = true, env = ENV_SENTRY_FRONTEND_PROJECT)]
    pub frontend_project: Option<String>,

    /// Frontend environment
    #[arg(long, global = true, env = ENV_SENTRY_FRONTEND_ENVIRONMENT)]
    pub frontend_environment: Option<String>,

    /// Backend project id
    #[arg(long, global = true, env = ENV_SENTRY_BACKEND_PROJECT)]
    pub backend_project: Option<String>,

    /// Backend environment
    #[arg(long, global = true, env = ENV_SENTRY_BACKEND_ENVIRONMENT)]
    pub backend_environment: Option<String>,

    /// Referrer tag sent with every events query
    #[arg(long, global = true, env = ENV_REFERRER)]
    pub referrer: Option<String>,

    /// Reporting window length in days
    #[arg(long, global = true, env = ENV_LOOKBACK_DAYS)]
    pub lookback_days: Option<u32>,

    /// Timeout for one Sentry API call in seconds
    #[arg(long, global = true, env = ENV_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: Option<u64>,

    // Cache options
    /// Cache backend (memory or redis)
    #[arg(long, global = true, env = ENV_CACHE_BACKEND, value_parser = parse_cache_backend_type)]
    pub cache_backend: Option<CacheBackendType>,

    /// Maximum number of cache entries
    #[arg(long, global = true, env = ENV_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: Option<u64>,

    /// Redis-compatible cache URL. Supports Redis, Sentinel, Valkey, Dragonfly.
    /// Formats: redis://host:port/db, redis+sentinel://s1:port,s2:port/master/db
    #[arg(long, global = true, env = ENV_CACHE_REDIS_URL)]
    pub cache_redis_url: Option<String>,
}

/// Parse cache backend type from CLI/env string
fn parse_cache_backend_type(s: &str) -> Result<CacheBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(CacheBackendType::Memory),
        "redis" => Ok(CacheBackendType::Redis),
        _ => Err(format!(
            "Invalid cache backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the dashboard server (default command)
    Start,
    /// Response cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// Drop every cached Sentry API response from the shared (redis) cache
    Clear,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub sentry_base_url: Option<String>,
    pub sentry_token: Option<String>,
    pub org_slug: Option<String>,
    pub frontend_project: Option<String>,
    pub frontend_environment: Option<String>,
    pub backend_project: Option<String>,
    pub backend_environment: Option<String>,
    pub referrer: Option<String>,
    pub lookback_days: Option<u32>,
    pub request_timeout: Option<u64>,
    pub cache_backend: Option<CacheBackendType>,
    pub cache_max_entries: Option<u64>,
    pub cache_redis_url: Option<String>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            sentry_base_url: cli.sentry_base_url,
            sentry_token: cli.sentry_token,
            org_slug: cli.org_slug,
            frontend_project: cli.frontend_project,
            frontend_environment: cli.frontend_environment,
            backend_project: cli.backend_project,
            backend_environment: cli.backend_environment,
            referrer: cli.referrer,
            lookback_days: cli.lookback_days,
            request_timeout: cli.request_timeout,
            cache_backend: cli.cache_backend,
            cache_max_entries: cli.cache_max_entries,
            cache_redis_url: cli.cache_redis_url,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (cli.into(), command)
}
