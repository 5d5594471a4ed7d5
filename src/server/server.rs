use anyhow::{Context, Result};
use axum::Router;
use tracing::{error, info};

use crate::config::settings::SettingsConfig;
use crate::gate::auth_gate::AuthGate;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::token_route::TokenState;
use crate::sources::TokenExchanger;

pub struct AppState<E> {
    pub metrics_state: MetricsState,
    pub token_state: TokenState<E>,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            metrics_state: self.metrics_state.clone(),
            token_state: self.token_state.clone(),
        }
    }
}

impl<E: TokenExchanger> AppState<E> {
    pub fn new(metrics: &Metrics, gate: AuthGate<E>) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            token_state: TokenState::new(gate),
        }
    }
}

/// Token and metrics routes, state attached.
pub async fn app<E: TokenExchanger>(settings_config: &SettingsConfig, gate: AuthGate<E>) -> Router {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, gate);

    Router::new()
        .merge(state.token_state.router(&settings_config.server.token_path))
        .merge(state.metrics_state.router::<E>(&settings_config.metrics))
        .with_state(state)
}

/// Serve until the listener fails or the process receives Ctrl-C.
pub async fn start<E: TokenExchanger>(settings_config: &SettingsConfig, gate: AuthGate<E>) -> Result<()> {
    let app = app(settings_config, gate).await;

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);

    get_metrics().await.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    get_metrics().await.up.set(0);

    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

async fn wait_for_shutdown<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!("cannot listen for shutdown signal, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
