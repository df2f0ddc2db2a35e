//! CLI command implementations

pub mod balance;
pub mod credit;
pub mod debit;
pub mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use wallet_core::config::Config;
use wallet_core::domain::result::Result as WalletResult;
use wallet_core::domain::Receipt;
use wallet_core::{OperationResult, WalletContext, WalletError};

use crate::output;

/// Recorded as the `source` of revisions written from the command line
pub const CLI_SOURCE: &str = "cli";

/// Get the wallet directory from environment or default
pub fn get_wallet_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WALLET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".wallet"))
        .ok_or_else(|| anyhow!("Could not find home directory; set WALLET_DIR"))
}

/// Load settings without opening the database
pub fn load_config() -> Result<Config> {
    let wallet_dir = get_wallet_dir()?;
    Config::load(&wallet_dir).context("Failed to load configuration")
}

/// Get or create wallet context
pub fn get_context() -> Result<WalletContext> {
    let wallet_dir = get_wallet_dir()?;

    std::fs::create_dir_all(&wallet_dir)
        .with_context(|| format!("Failed to create wallet directory: {:?}", wallet_dir))?;

    WalletContext::new(&wallet_dir).context("Failed to initialize wallet context")
}

/// Print the outcome of a credit or debit
pub fn report(result: WalletResult<Receipt>, verb: &str, json: bool) -> Result<ExitCode> {
    if json {
        let failed = result.is_err();
        output::print_json(&OperationResult::from(result))?;
        return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
    }

    match result {
        Ok(receipt) => {
            output::success(&format!("{} committed", verb));
            println!("{}", output::wallet_table(&receipt.wallet));
            output::info(&format!("Transaction {}", receipt.transaction_id));
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ WalletError::OptimisticLock { .. }) => {
            output::error(&e.to_string());
            output::info("Re-run the command, or pass --retries to retry automatically");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            output::error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}
