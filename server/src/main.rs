use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use navi::Config;
use server::{app, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Streaming chat relay for the guided reflection flows")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "NAVI_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
    /// Directory holding the built frontend
    #[arg(long, env = "NAVI_STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    navi::init_tracing("info");

    let args = Args::parse();
    let config = Config::from_env()?;
    let client = config.client()?;
    tracing::info!(model = client.model(), "using upstream model");

    let app = app(AppState::new(client), args.static_dir);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not bind {}", args.bind))?;
    tracing::info!(addr = %args.bind, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
