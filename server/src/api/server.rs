//! HTTP server wiring

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::embedded;
use super::middleware;
use super::routes::{dashboard, health};
use crate::core::constants::SHUTDOWN_TIMEOUT_SECS;
use crate::core::{CoreApp, ShutdownService};
use crate::domain::MetricsContext;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = build_router(app.ctx.clone());
        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "HTTP server listening");

        serve(listener, router, &app.shutdown).await?;
        Ok(app)
    }
}

/// Full application router
pub fn build_router(ctx: Arc<MetricsContext>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/assets/{*path}", get(embedded::serve_asset))
        .merge(dashboard::routes(ctx))
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Serve until shutdown, then drain in-flight requests for a bounded time
async fn serve(listener: TcpListener, router: Router, shutdown: &ShutdownService) -> Result<()> {
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.wait())
        .into_future();

    let drain_deadline = {
        let wait = shutdown.wait();
        async move {
            wait.await;
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS)).await;
        }
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT_SECS,
                "Graceful shutdown timed out, dropping open connections"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::fetch::testing::context;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use httpmock::prelude::*;
    use tower::ServiceExt;

    async fn router() -> Router {
        let server = MockServer::start_async().await;
        build_router(Arc::new(context(&server.base_url()).await))
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .await
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_assets_route() {
        let response = router()
            .await
            .oneshot(Request::get("/assets/zentry.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router()
            .await
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = ShutdownService::new();
        let trigger = shutdown.clone();

        let handle = tokio::spawn(async move { serve(listener, router().await, &shutdown).await });
        trigger.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
