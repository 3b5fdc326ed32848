//! Entry point: loads config, wires every component, starts the always-on
//! workers, and serves health/metrics until shutdown.

mod app;
mod cli;
mod health;

use app::App;
use clap::Parser;
use cli::Cli;
use metrics_exporter_prometheus::PrometheusBuilder;
use rmk_core::RmkConfig;
use rmk_reflection::ReflectionConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Bounded drain window after a shutdown signal: waits for workers to drain
/// before closing transport clients, rather than blocking shutdown forever.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = if cli.dev {
        RmkConfig::default()
    } else {
        RmkConfig::load(&cli.config)?
    };

    let metrics_addr: SocketAddr = format!("0.0.0.0:{}", config.metrics_port).parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install prometheus exporter: {e}"))?;
    info!(%metrics_addr, "prometheus metrics listener installed");

    let reflection_config = ReflectionConfig {
        reflection_interval: config.reflection_interval(),
        decay_interval: config.decay_interval(),
        decay_rate: config.activation_decay_rate,
        activation_threshold: rmk_reflection::DEFAULT_ACTIVATION_THRESHOLD,
        min_batch: config.min_reflection_batch,
        max_batch: config.max_reflection_batch,
    };

    let app = App::build(config, cli.dev).await?;
    let cancel = CancellationToken::new();
    let mut worker_handles = app.spawn_workers(reflection_config, cancel.clone());

    let readiness = Arc::new(health::ReadinessState::default());
    readiness.mark_ready();
    let health_addr: SocketAddr = "0.0.0.0:8081".parse()?;
    let health_cancel = cancel.clone();
    worker_handles.push(tokio::spawn(async move {
        if let Err(err) = health::serve(health_addr, readiness, health_cancel).await {
            warn!(%err, "health server exited with error");
        }
    }));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, cancelling workers");
    cancel.cancel();

    let drain = async {
        for handle in worker_handles {
            let _ = handle.await;
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("workers did not drain within the shutdown grace period");
    }

    Ok(())
}
