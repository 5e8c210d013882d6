//! Terminal client for a Kaiwa chat room.
//!
//! Run with:
//! ```not_rust
//! KAIWA_TOKEN=... cargo run --bin kaiwa-client -- --room-id 7 --sender-id 3
//! ```

use clap::Parser;
use kaiwa_client::{Args, ClientConfig};
use kaiwa_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match ClientConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = kaiwa_client::run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
