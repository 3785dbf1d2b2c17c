use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::ingestion::IngestionGateway;
use crate::throttle::{self, ClientThrottle};

/// Shared by every handler; built once per process.
pub struct AppState {
    pub gateway: IngestionGateway,
    pub throttle: ClientThrottle,
}

impl AppState {
    pub fn new(gateway: IngestionGateway, throttle: ClientThrottle) -> Self {
        Self { gateway, throttle }
    }
}

pub struct ApiServer {
    state: Arc<AppState>,
    request_timeout: Duration,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>, request_timeout: Duration) -> Self {
        Self {
            state,
            request_timeout,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/trades", post(handlers::submit_trade))
            .route("/stats/:account", get(handlers::get_stats))
            .route("/healthz", get(handlers::health))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                throttle::throttle,
            ))
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serves until `shutdown` resolves, then lets in-flight requests finish.
    pub async fn serve<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Trade API listening on {}", listener.local_addr()?);

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Trade API stopped");
        Ok(())
    }
}
