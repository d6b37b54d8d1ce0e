//! Chat relay - Entry Point
//!
//! Relays short text messages and presence notices between named clients.

use clap::Parser;
use log::{error, info};
use std::process;

use chat_relay::{RelayConfig, Server};

#[derive(Parser, Debug)]
#[command(name = "chat-relay", version, about = "Multi-client chat relay")]
struct Cli {
    /// TCP port to listen on (all interfaces)
    port: u16,
}

#[tokio::main]
async fn main() {
    // env_logger picks up RUST_LOG
    env_logger::init();

    let cli = Cli::parse();

    let config = match RelayConfig::load(cli.port) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    info!("Launching chat relay...");

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            process::exit(1);
        }
    };
    server.run().await;
}
