//! llm-gateway
//!
//! An observability-first HTTP gateway in front of LLM provider APIs.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │                 LLM GATEWAY                    │
//!                    │                                                │
//!  Client Request    │  ┌──────────┐   ┌────────────┐   ┌─────────┐  │
//!  ──────────────────┼─▶│   http   │──▶│ middleware │──▶│ forward │──┼──▶ Provider
//!                    │  │  server  │   │   chain    │   │         │  │    (OpenAI,
//!  Client Response   │  └──────────┘   └─────┬──────┘   └─────────┘  │     Cohere)
//!  ◀─────────────────┼────────────────────────┼──────────────────────┤
//!                    │                        ▼                      │
//!                    │  ┌──────────────────────────────────────────┐ │
//!                    │  │            observability                  │ │
//!                    │  │  propagation → span → export queue ───────┼─┼──▶ Trace
//!                    │  │  logging (trace-correlated)               │ │    collector
//!                    │  │  metrics (Prometheus /metrics)            │ │
//!                    │  └──────────────────────────────────────────┘ │
//!                    │  ┌────────────┐  ┌───────────┐  ┌──────────┐  │
//!                    │  │   config   │  │ lifecycle │  │resilience│  │
//!                    │  └────────────┘  └───────────┘  └──────────┘  │
//!                    └───────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use llm_gateway::config::{loader, GatewayConfig};
use llm_gateway::lifecycle::{signals, Shutdown};
use llm_gateway::observability::logging;
use llm_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "llm-gateway")]
#[command(about = "Observability-first proxy in front of LLM provider APIs", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        service = %config.tracing.service_name,
        collector = %config.tracing.collector_endpoint,
        "llm-gateway starting"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(signals::listen(Arc::clone(&shutdown)));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
