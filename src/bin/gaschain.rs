#![forbid(unsafe_code)]
//! GasChain command line: run the node, generate station keys, sign readings.

use clap::{Parser, Subcommand};
use colored::Colorize;
use gaschain::config::{load_config_from, DEFAULT_CONFIG_PATH};
use gaschain::crypto::KeyPair;
use gaschain::node::{init_tracing, Node};
use gaschain::transaction::Transaction;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gaschain", version, about = "Gas balance ledger node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API node
    Serve {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Override api.port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override chain.difficulty
        #[arg(short, long)]
        difficulty: Option<u32>,
    },
    /// Generate a station key pair
    Keygen,
    /// Sign a transaction JSON file and print the signed transaction
    Sign {
        /// Path to the unsigned transaction JSON
        transaction: PathBuf,
        /// Hex-encoded secret key
        #[arg(short, long, env = "GASCHAIN_SECRET_KEY")]
        secret_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            difficulty,
        } => {
            init_tracing();
            let mut config = load_config_from(&config)?;
            if let Some(port) = port {
                config.api.port = port;
            }
            if let Some(difficulty) = difficulty {
                config.chain.difficulty = difficulty;
            }
            config.validate()?;

            Node::init(config)?.start().await?;
        }
        Command::Keygen => {
            let keypair = KeyPair::generate();
            println!("{}", "New station key pair".bold().green());
            println!("{:<12} {}", "identity:".bold(), keypair.identity());
            println!("{:<12} {}", "secret:".bold(), keypair.secret_hex().yellow());
            println!("{}", "Keep the secret key private.".dimmed());
        }
        Command::Sign {
            transaction,
            secret_key,
        } => {
            let keypair = KeyPair::from_secret_hex(&secret_key)?;
            let mut tx: Transaction = serde_json::from_str(&fs::read_to_string(&transaction)?)?;
            if tx.sender != keypair.identity() {
                eprintln!(
                    "{} sender does not match the signing key; the signature will not verify",
                    "warning:".yellow().bold()
                );
            }
            tx.sign(&keypair)?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
    }

    Ok(())
}
