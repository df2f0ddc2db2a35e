//! Balance command - show a wallet's balance and version

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use uuid::Uuid;
use wallet_core::OperationResult;

use super::get_context;
use crate::output;

pub async fn run(id: Uuid, json: bool) -> Result<ExitCode> {
    let ctx = get_context()?;
    let result = ctx.wallet_service.get_wallet(id).await;

    if json {
        let failed = result.is_err();
        output::print_json(&OperationResult::from(result))?;
        return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
    }

    let wallet = result?;
    if !wallet.is_materialized() {
        println!("{}", "No transactions yet".dimmed());
    }
    println!("{}", output::wallet_table(&wallet));
    Ok(ExitCode::SUCCESS)
}
