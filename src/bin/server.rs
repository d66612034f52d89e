// Chat Server Binary
// Loads configuration, sets up logging and runs the accept loop

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use safechat::protocol::Server;
use safechat::{logging, ServerConfig};

/// Encrypted chat server
#[derive(Parser, Debug)]
#[command(name = "safechat-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Pause before SERVER_DONE in milliseconds (overrides the config file)
    #[arg(long)]
    done_delay_ms: Option<u64>,

    /// Default log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config = config.with_bind_addr(bind);
    }
    if let Some(delay) = cli.done_delay_ms {
        config.done_delay_ms = delay;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    logging::init(&config.log_level);
    info!("Server Running...");

    let server = Server::bind(config).await.context("starting server")?;
    info!("Bound to {}", server.local_addr()?);
    server.run().await;

    Ok(())
}
