//! Credit command - add funds to a wallet

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

    let result = with_retry(retries, || {
        service.credit_with(id, amount, RevisionMetadata::from_source(CLI_SOURCE))
    })
    .await;
    report(result, "Credit", json)
}
