//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CacheCommands, CliConfig, Commands};
use crate::core::config::{AppConfig, CacheBackendType, CacheConfig};
use crate::core::constants::{APP_NAME_LOWER, ENV_CACHE_BACKEND, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::cache::{CacheKey, CacheService};
use crate::data::sentry::SentryClient;
use crate::domain::MetricsContext;
use crate::domain::metrics::SystemClock;

const CACHE_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub cache: Arc<CacheService>,
    pub ctx: Arc<MetricsContext>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Cache { command }) => {
                Self::handle_cache_command(&cli_config, command).await
            }
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let cache = Self::init_cache(&config).await?;

        let client = SentryClient::new(&config.sentry, cache.clone(), config.cache.ttl)
            .context("Failed to initialize Sentry API client")?;
        let ctx = Arc::new(MetricsContext::new(
            Arc::new(client),
            Arc::new(SystemClock),
            config.sentry.clone(),
        ));

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            cache,
            ctx,
        })
    }

    async fn init_cache(config: &AppConfig) -> Result<Arc<CacheService>> {
        let cache = CacheService::new(&config.cache)
            .await
            .context("Failed to initialize cache service")?;
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");
        Ok(Arc::new(cache))
    }

    async fn handle_cache_command(cli: &CliConfig, cmd: CacheCommands) -> Result<()> {
        match cmd {
            CacheCommands::Clear => {
                let config = AppConfig::load(cli)?;
                ensure_shared_cache(&config.cache)?;
                let cache = Self::init_cache(&config).await?;
                let removed = clear_cache(&cache).await?;
                println!(
                    "Cleared {} cached API response(s) from the {} cache",
                    removed,
                    cache.backend_name()
                );
                Ok(())
            }
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        // Cache outages only degrade to uncached fetches
        match tokio::time::timeout(CACHE_HEALTH_TIMEOUT, app.cache.health_check()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Cache health check failed"),
            Err(_) => tracing::warn!("Cache health check timed out"),
        }

        banner::print_banner(&app.config);

        let server = ApiServer::new(app);
        let app = server.start().await?;
        tracing::info!(cache = app.cache.backend_name(), "Server stopped");

        Ok(())
    }
}

/// Clearing from a separate process only reaches a cache shared with the server
fn ensure_shared_cache(config: &CacheConfig) -> Result<()> {
    if config.backend == CacheBackendType::Memory {
        bail!(
            "The in-memory cache lives inside the running server and cannot be cleared from \
             another process; restart the server to clear it, or use the redis backend \
             (--cache-backend redis or {}=redis)",
            ENV_CACHE_BACKEND
        );
    }
    Ok(())
}

/// Drop every cached API response, returning the number of removed entries
async fn clear_cache(cache: &CacheService) -> Result<u64> {
    cache
        .invalidate(&CacheKey::api_responses_pattern())
        .await
        .context("Failed to clear response cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> CacheConfig {
        CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 100,
            redis_url: None,
            ttl: Duration::from_secs(60),
        }
    }

    async fn memory_cache() -> CacheService {
        CacheService::new(&memory_config()).await.unwrap()
    }

    #[test]
    fn test_clear_rejects_memory_backend() {
        let err = ensure_shared_cache(&memory_config()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("in-memory cache"), "{message}");
        assert!(message.contains(ENV_CACHE_BACKEND), "{message}");
    }

    #[test]
    fn test_clear_accepts_redis_backend() {
        let config = CacheConfig {
            backend: CacheBackendType::Redis,
            redis_url: Some("redis://127.0.0.1:6379".to_string()),
            ..memory_config()
        };
        assert!(ensure_shared_cache(&config).is_ok());
    }

    #[tokio::test]
    async fn test_clear_cache_only_drops_api_responses() {
        let cache = memory_cache().await;
        let ttl = Some(Duration::from_secs(60));
        let key = CacheKey::api_response("https://sentry.io/api/0/x/", &[], &[]);
        cache.set(&key, &"cached", ttl).await.unwrap();
        cache.set("other:key", &"kept", ttl).await.unwrap();

        let removed = clear_cache(&cache).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.get::<String>(&key).await.unwrap(), None);
        assert_eq!(
            cache.get::<String>("other:key").await.unwrap().as_deref(),
            Some("kept")
        );
    }
}
