//! Crew UI server - web form in front of the multi-agent coding pipeline.

mod render;
mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crew::io::config::{DEFAULT_CONFIG_FILE, load_config};
use crew::io::executor::executor_from_env;
use tracing::info;

use crate::state::{AppState, SharedExecutor};

#[derive(Parser)]
#[command(name = "crew-ui")]
#[command(about = "Web UI for the multi-agent coding pipeline")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crew_ui=info".parse()?)
                .add_directive("crew=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = load_config(&args.config)?;
    info!(config = %args.config.display(), backend = ?config.backend, "starting crew-ui");

    // The HTTP backend uses a blocking client, which must be built off the async runtime.
    let backend_config = config.clone();
    let executor: SharedExecutor =
        tokio::task::spawn_blocking(move || executor_from_env(&backend_config))
            .await?
            .context("configure agent backend")?
            .into();

    let state = AppState::new(config, executor)?;
    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
