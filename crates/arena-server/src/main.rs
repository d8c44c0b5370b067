//! Arena server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port
//! arena-server --bind 0.0.0.0:3000
//!
//! # Same, configured from the environment
//! ARENA_BIND=127.0.0.1:3000 ARENA_DEFAULT_LANGUAGE=python arena-server
//! ```

use arena_server::{DriverConfig, Server, ServerRuntimeConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Arena room-synchronization server
#[derive(Parser, Debug)]
#[command(name = "arena-server")]
#[command(about = "Realtime room coordinator for collaborative editing")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, env = "ARENA_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// Maximum concurrent connections
    #[arg(long, env = "ARENA_MAX_CONNECTIONS", default_value = "10000")]
    max_connections: usize,

    /// Language given to newly created rooms
    #[arg(long, env = "ARENA_DEFAULT_LANGUAGE", default_value = "javascript")]
    default_language: String,

    /// Per-connection outbound queue capacity
    #[arg(long, env = "ARENA_OUTBOUND_BUFFER", default_value = "256")]
    outbound_buffer: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ARENA_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Arena server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        outbound_buffer: args.outbound_buffer,
        driver: DriverConfig {
            max_connections: args.max_connections,
            default_language: args.default_language,
        },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
