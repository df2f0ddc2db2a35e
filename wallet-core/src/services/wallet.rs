//! Wallet service - the optimistic read-decide-write engine
//!
//! Every operation is one read followed by at most one conditional write.
//! There is no retry loop and no lock: when two callers race on the same
//! version, the store lets exactly one insert through and the other gets
//! [`WalletError::OptimisticLock`] back. Retrying is the caller's decision
//! (see [`crate::services::retry`]).

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::operations;
use crate::domain::result::{Result, WalletError};
use crate::domain::{MutationKind, Receipt, RevisionMetadata, Wallet, WalletRevision};
use crate::ports::{StoreError, WalletRepository};
use crate::services::conflict::{classify, into_wallet_error, FaultClass};

/// Balance engine over an injected store
#[derive(Clone)]
pub struct WalletService {
    repository: Arc<dyn WalletRepository>,
}

impl WalletService {
    pub fn new(repository: Arc<dyn WalletRepository>) -> Self {
        Self { repository }
    }

    /// Current balance and version; an unknown wallet reads as zero at version 0.
    /// Never writes.
    pub async fn get_wallet(&self, id: Uuid) -> Result<Wallet> {
        let wallet = self.read(id).await?;
        Ok(wallet.unwrap_or_else(|| Wallet::empty(id)))
    }

    /// Add `amount` to the wallet, creating it on first credit
    pub async fn credit(&self, id: Uuid, amount: Decimal) -> Result<Wallet> {
        let receipt = self.credit_with(id, amount, RevisionMetadata::default()).await?;
        Ok(receipt.wallet)
    }

    /// Credit that records `metadata` on the stored revision
    pub async fn credit_with(
        &self,
        id: Uuid,
        amount: Decimal,
        metadata: RevisionMetadata,
    ) -> Result<Receipt> {
        operations::validate_amount(amount)?;
        let amount = operations::to_money(amount);

        let current = match self.read(id).await? {
            Some(wallet) => wallet,
            None => Wallet::empty(id),
        };
        let balance = operations::credit(current.balance, amount)?;

        let revision = WalletRevision::next(&current, balance, amount, MutationKind::Credit)
            .with_metadata(metadata);
        let receipt = self.commit(&current, revision).await?;

        if current.version == 0 {
            info!(wallet_id = %id, "created new wallet");
        }
        info!(
            wallet_id = %id,
            transaction_id = %receipt.transaction_id,
            request_id = receipt.request_id.as_deref().unwrap_or("-"),
            amount = %amount,
            balance = %receipt.wallet.balance,
            version = receipt.wallet.version,
            "credit committed"
        );
        Ok(receipt)
    }

    /// Subtract `amount` from an existing wallet.
    ///
    /// Unlike credit, a missing wallet is an error: there is nothing to debit.
    pub async fn debit(&self, id: Uuid, amount: Decimal) -> Result<Wallet> {
        let receipt = self.debit_with(id, amount, RevisionMetadata::default()).await?;
        Ok(receipt.wallet)
    }

    /// Debit that records `metadata` on the stored revision
    pub async fn debit_with(
        &self,
        id: Uuid,
        amount: Decimal,
        metadata: RevisionMetadata,
    ) -> Result<Receipt> {
        operations::validate_amount(amount)?;
        let amount = operations::to_money(amount);

        let current = self
            .read(id)
            .await?
            .ok_or(WalletError::WalletNotFound(id))?;

        let balance = match operations::debit(current.balance, amount) {
            Ok(balance) => balance,
            Err(e) => {
                debug!(wallet_id = %id, amount = %amount, error = %e, "debit rejected");
                return Err(e);
            }
        };

        let revision = WalletRevision::next(&current, balance, amount, MutationKind::Debit)
            .with_metadata(metadata);
        let receipt = self.commit(&current, revision).await?;

        info!(
            wallet_id = %id,
            transaction_id = %receipt.transaction_id,
            request_id = receipt.request_id.as_deref().unwrap_or("-"),
            amount = %amount,
            balance = %receipt.wallet.balance,
            version = receipt.wallet.version,
            "debit committed"
        );
        Ok(receipt)
    }

    async fn read(&self, id: Uuid) -> Result<Option<Wallet>> {
        let wallet = self.repository.find_wallet(id).await.map_err(|e| {
            error!(wallet_id = %id, error = %e, "failed to read wallet");
            WalletError::storage(e.to_string())
        })?;
        debug!(
            wallet_id = %id,
            version = wallet.as_ref().map_or(0, |w| w.version),
            "wallet read"
        );
        Ok(wallet)
    }

    async fn commit(&self, current: &Wallet, revision: WalletRevision) -> Result<Receipt> {
        match self.repository.insert_revision(&revision).await {
            Ok(()) => Ok(Receipt::new(revision, current)),
            Err(fault) => {
                log_fault(&fault);
                Err(into_wallet_error(fault))
            }
        }
    }
}

fn log_fault(fault: &StoreError) {
    match (classify(fault), fault) {
        (FaultClass::VersionConflict, StoreError::VersionConflict { wallet_id, version }) => {
            warn!(wallet_id = %wallet_id, version, "stale write rejected");
        }
        _ => error!(error = %fault, "failed to write wallet revision"),
    }
}
