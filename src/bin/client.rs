// Chat Client Binary
// Prompts for the server address, runs the handshake, then relays user input

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use safechat::protocol::{ChatClient, Transport};
use safechat::{logging, ClientConfig};

/// Encrypted chat client
#[derive(Parser, Debug)]
#[command(name = "safechat-client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address; prompts when omitted
    #[arg(short, long)]
    addr: Option<String>,
}

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::default(),
    };
    logging::init(&config.log_level);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let addr = match cli.addr {
        Some(addr) => addr,
        None => {
            prompt(&format!("please enter address (defaults to {}): ", config.server_addr))?;
            match lines.next_line().await?.map(|line| line.trim().to_string()) {
                Some(line) if !line.is_empty() => line,
                _ => config.server_addr.clone(),
            }
        }
    };

    let transport = Transport::connect(&addr)
        .await
        .with_context(|| format!("connecting to {}", addr))?;
    let mut client = ChatClient::new(transport);

    if let Err(e) = client.handshake().await {
        error!("an error occured during the handshake: {}", e);
        eprintln!("an error occured during the handshake: {}", e);
        process::exit(1);
    }
    println!("[server done] handshake complete");

    loop {
        prompt("Write your message: ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let exchange = client.send_line(&line).await.context("talking to server")?;
        println!("{}", client.describe_reply(&exchange.reply));

        if exchange.is_close() {
            break;
        }
    }

    Ok(())
}
