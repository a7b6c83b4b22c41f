//! Interactive chat client
//!
//! Run with: relay-chat-client [--host HOST] [--port PORT] [--username NAME]
//!
//! Type a line and press enter to send it. An empty line is ignored;
//! `/quit` or end of input (Ctrl-D) disconnects.

use std::io::Write;

use clap::Parser;
use relay_chat::client::{classify_input, InputAction};
use relay_chat::protocol::constants::{DEFAULT_CONNECT_HOST, DEFAULT_PORT};
use relay_chat::{ChatClient, ClientConfig, ClientEvent};
use tokio::sync::mpsc;

/// CLI chat client
#[derive(Parser)]
#[command(name = "relay-chat-client")]
#[command(about = "Connect to a relay-chat server")]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = DEFAULT_CONNECT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Username to display
    #[arg(short, long)]
    username: Option<String>,
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Diagnostics only; chat output goes straight to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_chat=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::new(args.host.clone(), args.port);
    if let Some(name) = args.username {
        config = config.username(name);
    }

    let (mut client, mut events) = match ChatClient::connect(config).await {
        Ok(connected) => connected,
        Err(e) => {
            println!("Failed to connect to {}:{}: {}", args.host, args.port, e);
            std::process::exit(1);
        }
    };

    let mut printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::Message(text) => {
                    print!("\n{}\n> ", text);
                    let _ = std::io::stdout().flush();
                }
                ClientEvent::ServerClosed => println!("\nServer closed connection."),
                ClientEvent::ConnectionLost(e) => println!("\nReceiver error: {}", e),
            }
        }
    });

    // Blocking stdin on its own thread; it is detached and dies with the process
    let (line_tx, mut lines) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        prompt();

        let line = tokio::select! {
            _ = &mut printer => break,
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted. Exiting.");
                break;
            }
            line = lines.recv() => line,
        };

        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(_)) | None => break,
        };

        match classify_input(&line) {
            InputAction::Ignore => continue,
            InputAction::Quit => break,
            InputAction::Send(message) => {
                if client.send(message).await.is_err() {
                    println!("Connection broken. Exiting.");
                    break;
                }
            }
        }
    }

    client.close().await;
    printer.abort();

    Ok(())
}
