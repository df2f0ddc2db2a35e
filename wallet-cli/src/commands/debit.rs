//! Debit command - remove funds from a wallet

use std::process::ExitCode;

use anyhow::Result;
use rust_decimal::Decimal;
use uuid::Uuid;
use wallet_core::domain::RevisionMetadata;
use wallet_core::services::with_retry;

use super::{get_context, report, CLI_SOURCE};

pub async fn run(id: Uuid, amount: Decimal, retries: u32, json: bool) -> Result<ExitCode> {
    let ctx = get_context()?;
    let service = &ctx.wallet_service;

    // A retry re-reads the balance, so a debit that raced a withdrawal may
    // come back as insufficient funds rather than succeed
    let result = with_retry(retries, || {
        service.debit_with(id, amount, RevisionMetadata::from_source(CLI_SOURCE))
    })
    .await;
    report(result, "Debit", json)
}
