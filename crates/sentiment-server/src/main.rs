//! Sentiment Server
//!
//! Customer feedback sentiment service. Labels text with a local BERT
//! classifier or a remote completion endpoint and stores submitted feedback.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use sentiment_server::{build_app, run_server, AppState, ServerConfig};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sentiment-server")]
#[command(about = "Customer feedback sentiment analysis service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen address [default: 0.0.0.0]
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port [default: 8000]
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Feedback store URL (redis://, file://, memory://)
    #[arg(short, long)]
    store_url: Option<String>,

    /// Model registry name for the bert method
    #[arg(short, long)]
    model: Option<String>,

    /// Load the local model before accepting requests
    #[arg(long)]
    preload_model: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.store_url {
            config.store.url = url.clone();
        }
        if let Some(model) = &self.model {
            config.classifier.model = model.clone();
        }
        if self.preload_model {
            config.classifier.preload = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting sentiment service");

    let mut config = ServerConfig::load(&cli.config)?;
    cli.apply(&mut config);
    info!("Configuration loaded");

    let metrics_handle = init_metrics()?;

    let state = AppState::from_config(&config)?.with_metrics(metrics_handle);

    if config.classifier.preload {
        info!("Preloading model '{}'", config.classifier.model);
        state
            .analyzer
            .local()
            .preload()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to preload model: {}", e))?;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.listen, config.server.port).parse()?;
    let app = build_app(state, &config.server);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    run_server(app, addr, shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("sentiment=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentiment=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "sentiment_requests_total",
        "Total number of requests by endpoint"
    );
    metrics::describe_counter!(
        "sentiment_classifications_total",
        "Total number of classifications by method and label"
    );
    metrics::describe_histogram!(
        "sentiment_inference_latency_us",
        metrics::Unit::Microseconds,
        "Classification latency in microseconds by method"
    );
    metrics::describe_counter!("sentiment_errors_total", "Total number of errors by kind");

    info!("Metrics exporter initialized");
    Ok(handle)
}
