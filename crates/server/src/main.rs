use anyhow::{Context, Result};
use monitor_core::{
    config::AppConfig,
    rpc::{HttpTransport, RpcClient},
    BroadcastHub, Poller, RateLimiter,
};
use server::router::{self, AppState};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG=debug` and `RUST_LOG=trace` raise only this workspace's crates;
/// any other `RUST_LOG` value is used as a full filter directive.
fn init_logging(config: &AppConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" {
            EnvFilter::new("warn,monitor_core=debug,server=debug,rpc_monitor=debug,tower_http=debug")
        } else if env_filter == "trace" {
            EnvFilter::new("warn,monitor_core=trace,server=trace,rpc_monitor=trace,tower_http=trace")
        } else {
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
                EnvFilter::new("warn,monitor_core=debug,server=debug,rpc_monitor=debug")
            })
        }
    } else {
        let level = config.logging.level.as_str();
        EnvFilter::try_new(format!("warn,monitor_core={level},server={level},rpc_monitor={level}"))
            .unwrap_or_else(|_| {
                EnvFilter::new("warn,monitor_core=info,server=info,rpc_monitor=info")
            })
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting RPC monitor");
    debug!(
        endpoint = %config.rpc.endpoint_url,
        interval_ms = config.polling.interval_ms,
        window_capacity = config.polling.window_capacity,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        "Configuration loaded"
    );

    let transport = Arc::new(HttpTransport::new().context("Failed to build HTTP transport")?);
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limiter_config()));
    let client = Arc::new(RpcClient::new(transport, rate_limiter, config.rpc_client_config()));
    let hub = Arc::new(BroadcastHub::default());
    let poller = Arc::new(Poller::new(client, hub.clone(), config.poller_config()));

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind push server to {addr}"))?;
    info!(address = %addr, "Push server listening");

    poller.start();

    router::serve_until(listener, AppState::new(poller.clone(), hub), shutdown_signal())
        .await
        .context("Push server failed")?;

    info!(cycles = poller.cycles_completed(), "Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");

                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, stopping poller and draining connections");
}
