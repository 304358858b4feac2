//! o11y-mcp - Main entry point
//!
//! stdin/stdout 은 MCP 프로토콜 채널이므로 로그는 stderr 로만 출력합니다.

use anyhow::Context;
use clap::Parser;
use o11y_core::{McpServer, QueryExecutor, ToolRegistry};
use o11y_foundation::{CacheSweeper, ResultCache, ServerConfig};
use o11y_provider::CloudLoggingClient;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// o11y-mcp - quota-protected Cloud Logging queries over MCP
#[derive(Parser, Debug)]
#[command(name = "o11y-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: <config dir>/o11y-mcp/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project to query (overrides config)
    #[arg(short, long, env = "GOOGLE_CLOUD_PROJECT")]
    project: Option<String>,

    /// Server name reported to MCP clients
    #[arg(long)]
    name: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ServerConfig::load_default().context("failed to load default config")?,
        };

        if let Some(project) = &self.project {
            config.project.id = Some(project.clone());
        }
        if let Some(name) = &self.name {
            config.server.name = name.clone();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let config = args.load_config()?;
    let store = CloudLoggingClient::from_settings(&config.project)
        .context("failed to create Cloud Logging client")?;
    info!(
        "Starting {} v{} for project {}",
        config.server.name,
        config.server.version,
        store.project_id()
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    // 프로세스 전체에서 하나의 캐시를 공유
    let cache = Arc::new(ResultCache::new());
    let sweeper = CacheSweeper::spawn_with_token(
        Arc::clone(&cache),
        config.cache.sweep_interval(),
        shutdown.clone(),
    );

    let executor = QueryExecutor::from_config(Arc::new(store), cache, &config)
        .with_cancellation(shutdown.clone());
    let registry = Arc::new(ToolRegistry::with_query_tools(Arc::new(executor)));

    let result = McpServer::new(registry, &config.server)
        .serve_stdio(shutdown.clone())
        .await;

    shutdown.cancel();
    sweeper.stop().await;
    info!("Server stopped");

    result.context("MCP server failed")
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
