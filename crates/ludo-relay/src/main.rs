//! ludo-relay binary: loads config, initialises logging, and serves the
//! WebSocket gateway and room API until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use ludo_relay::RelayServer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ludo-relay", version, about = "Room relay for Ludo game state and voice")]
struct Args {
    /// Config file path (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. "ludo_relay=debug".
    #[arg(long)]
    log_level: Option<String>,

    /// WebSocket port override.
    #[arg(short, long)]
    port: Option<u16>,

    /// HTTP API port override.
    #[arg(long)]
    api_port: Option<u16>,
}

fn init_tracing(directive: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let loaded = ludo_config::load_config(args.config.as_deref());

    let (level, json) = match &loaded {
        Ok(config) => (config.logging.level.as_directive(), config.logging.json),
        Err(_) => ("info", false),
    };
    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("ludo_relay={level},ludo_config={level}"));
    init_tracing(&directive, json);

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.server.ws_port = port;
    }
    if let Some(port) = args.api_port {
        config.server.api_port = port;
    }
    if let Err(e) = ludo_config::validation::validate(&config) {
        tracing::error!("invalid config after CLI overrides: {e}");
        std::process::exit(1);
    }

    tracing::info!("ludo-relay v{} starting", env!("CARGO_PKG_VERSION"));
    let server = RelayServer::new(config);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!("server stopped: {e}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
}
