//! Wallet CLI - balances with optimistic locking, from the terminal or over HTTP

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;
use wallet_core::services::DEFAULT_MAX_RETRIES;

mod api;
mod commands;
mod logging;
mod output;

use commands::{balance, credit, debit, serve};

/// Wallet - account balances with optimistic concurrency
#[derive(Parser)]
#[command(name = "wallet", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides settings and WALLET_PORT)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Show a wallet's balance and version
    Balance {
        /// Wallet ID
        id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add funds to a wallet, creating it if needed
    Credit {
        /// Wallet ID
        id: Uuid,
        /// Amount, at most two decimal places
        amount: Decimal,
        /// Retries after a concurrent modification
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        retries: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove funds from a wallet
    Debit {
        /// Wallet ID
        id: Uuid,
        /// Amount, at most two decimal places
        amount: Decimal,
        /// Retries after a concurrent modification
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        retries: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = commands::load_config()?;
    // One-shot commands stay quiet unless RUST_LOG asks otherwise
    let level = match cli.command {
        Commands::Serve { .. } => config.logging.level.as_str(),
        _ => "warn",
    };
    logging::init_logging(level, config.logging.format);

    match cli.command {
        Commands::Serve { port } => serve::run(port).await,
        Commands::Balance { id, json } => balance::run(id, json).await,
        Commands::Credit { id, amount, retries, json } => {
            credit::run(id, amount, retries, json).await
        }
        Commands::Debit { id, amount, retries, json } => {
            debit::run(id, amount, retries, json).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_credit() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["wallet", "credit", &id.to_string(), "10.50", "--json"])
            .unwrap();
        match cli.command {
            Commands::Credit { id: parsed, amount, retries, json } => {
                assert_eq!(parsed, id);
                assert_eq!(amount, Decimal::new(1050, 2));
                assert_eq!(retries, DEFAULT_MAX_RETRIES);
                assert!(json);
            }
            _ => panic!("expected credit"),
        }
    }

    #[test]
    fn test_rejects_bad_wallet_id() {
        assert!(Cli::try_parse_from(["wallet", "balance", "nope"]).is_err());
    }
}
