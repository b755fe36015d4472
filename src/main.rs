use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use aloha::config::load_config;
use aloha::http::HttpServer;
use aloha::lifecycle::{signals, Shutdown};
use aloha::observability::{logging, tracing::select_tracer};

#[derive(Debug, Parser)]
#[command(name = "aloha", version, about = "Aloha greeting service with distributed tracing")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.logging)?;

    tracing::info!("aloha v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        tracing_system = ?config.tracing.system,
        "Configuration loaded"
    );

    let tracer = select_tracer(&config.tracing, &config.reporter);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::forward_ctrl_c(shutdown.clone());

    let server = HttpServer::new(config, tracer.clone());
    server.run(listener, shutdown.subscribe()).await?;

    tracer.close();
    // Give the reporter task a moment to push its final batch.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
