//! Namespace-routing registry proxy
//!
//! Fronts several container-registry mirrors behind one public port. Each
//! namespace gets its own backend served on a private Unix socket; requests
//! pick a namespace with the `ns` query parameter.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                  NAMESPACE PROXY                      │
//!                       │                                                       │
//!   Client Request      │  ┌─────────┐   ┌─────────┐   ┌───────────┐           │
//!   ────────────────────┼─▶│   net   │──▶│  http   │──▶│  routing  │           │
//!                       │  │listener │   │ server  │   │  ?ns=...  │           │
//!                       │  └─────────┘   └─────────┘   └─────┬─────┘           │
//!                       │                                    │                  │
//!                       │                                    ▼                  │
//!                       │                              ┌───────────┐            │
//!                       │                              │ namespace │            │
//!                       │                              │ registry  │            │
//!                       │                              └─────┬─────┘            │
//!                       │                                    │                  │
//!                       │                                    ▼                  │
//!   Client Response     │                              ┌───────────┐   unix    ┌┼─────────┐
//!   ◀───────────────────┼──────────────────────────────│   relay   │──socket──▶│ backend  │──▶ upstream
//!                       │                              └───────────┘           └┼─────────┘
//!                       │                                                       │
//!                       │  ┌─────────────────────────────────────────────────┐  │
//!                       │  │ config │ observability │ lifecycle (fail fast)  │  │
//!                       │  └─────────────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use namespace_proxy::backend::UpstreamBackend;
use namespace_proxy::config::{read_config, validate_config, ProxyConfig};
use namespace_proxy::lifecycle::{shutdown_signal, Coordinator};
use namespace_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "namespace-proxy")]
#[command(about = "Routes registry requests to per-namespace backends", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the public listener address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the state directory holding per-namespace sockets.
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match read_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("Invalid configuration: {}", e);
        }
        return ExitCode::FAILURE;
    }

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "namespace-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        namespaces = config.namespaces.len(),
        default_namespace = %config.default_namespace,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // The address was checked by validate_config.
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let backend = match UpstreamBackend::new(Duration::from_secs(config.timeouts.connect_secs)) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create upstream client");
            return ExitCode::FAILURE;
        }
    };

    match Coordinator::new(config, Arc::new(backend))
        .run(shutdown_signal())
        .await
    {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Terminated");
            ExitCode::FAILURE
        }
    }
}
