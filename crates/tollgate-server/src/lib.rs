//! HTTP surface of the governance layer

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod handler;
mod health;
mod rate_limit;

use std::net::SocketAddr;

use axum::Router;
use tollgate_config::{Config, ServerConfig};
use tollgate_governor::Governor;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use handler::GovernRequest;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server and its governor from configuration
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let governor = Governor::from_config(config)?;
        Ok(Self::with_governor(&config.server, governor))
    }

    /// Build the server around an already assembled governor
    pub fn with_governor(config: &ServerConfig, governor: Governor) -> Self {
        let listen_address = config
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let limiter = governor.limiter();
        let mut app = handler::governance_router(governor);

        if config.health.enabled {
            app = app.route(&config.health.path, axum::routing::get(health::health_handler));
        }

        app = app.layer(TraceLayer::new_for_http());

        if limiter.has_global() {
            app = app.layer(axum::middleware::from_fn(move |req, next| {
                let limiter = limiter.clone();
                async move { rate_limit::global_rate_limit(limiter, req, next).await }
            }));
        }

        Self {
            router: app,
            listen_address,
        }
    }

    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until the cancellation token is triggered
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
