//! Chat server binary
//!
//! Run with: relay-chat-server [--host HOST] [--port PORT]
//!
//! Connect with `relay-chat-client` or any raw TCP tool (`nc localhost 12345`).
//! Send `/join NAME` to have your messages prefixed with `NAME: `.

use std::time::Duration;

use clap::Parser;
use relay_chat::protocol::constants::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use relay_chat::{ChatServer, ServerConfig};

/// Simple TCP chat server
#[derive(Parser)]
#[command(name = "relay-chat-server")]
#[command(about = "Relay every message to every other connected client")]
struct Args {
    /// Host to bind
    #[arg(short = 'H', long, default_value = DEFAULT_BIND_HOST, env = "RELAY_CHAT_HOST")]
    host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RELAY_CHAT_PORT")]
    port: u16,

    /// Give up on a peer whose write blocks longer than this (milliseconds)
    #[arg(long)]
    write_timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("relay_chat={}", level).parse()?)
                .add_directive(format!("relay_chat_server={}", level).parse()?),
        )
        .init();

    let mut config = match ServerConfig::resolve(&args.host, args.port).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(host = %args.host, port = args.port, error = %e, "Invalid bind address");
            std::process::exit(1);
        }
    };
    if let Some(ms) = args.write_timeout_ms {
        config = config.write_timeout(Duration::from_millis(ms));
    }

    let server = match ChatServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(host = %args.host, port = args.port, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    Ok(())
}
