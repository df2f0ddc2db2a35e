//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;
use wallet_core::{OperationResult, Wallet};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Key/value table for a single wallet
pub fn wallet_table(wallet: &Wallet) -> Table {
    let mut table = create_table();
    table.add_row(vec!["Wallet".to_string(), wallet.id.to_string()]);
    table.add_row(vec!["Balance".to_string(), format!("{:.2}", wallet.balance)]);
    table.add_row(vec!["Version".to_string(), wallet.version.to_string()]);
    if let Some(updated_at) = wallet.updated_at {
        table.add_row(vec![
            "Updated".to_string(),
            updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]);
    }
    table
}

/// Print an operation result as pretty JSON
pub fn print_json<T: Serialize>(result: &OperationResult<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
