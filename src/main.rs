//! CAS single sign-on gateway.
//!
//! Sits in front of one backend application and lets through only requests
//! that carry an authenticated session, sending everyone else to the CAS
//! login page.
//!
//! ```text
//!     Client ──▶ listener ──▶ classifier ──▶ admission ──▶ forwarder ──▶ Backend
//!                                              │   ▲
//!                                              ▼   │
//!                                     session cookie / CAS validate
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sso_gateway::config::load_config;
use sso_gateway::lifecycle::{signals, Shutdown};
use sso_gateway::observability::{logging, metrics};
use sso_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "sso-gateway")]
#[command(about = "Single sign-on gateway in front of a backend application", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "sso-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);
    server.run(listener, shutdown.signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
