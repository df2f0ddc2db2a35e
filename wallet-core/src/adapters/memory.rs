//! In-memory repository, for tests and for running the API without a database file

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Wallet, WalletRevision};
use crate::ports::{StoreError, StoreResult, WalletRepository};

/// Revisions per wallet, keyed by version
#[derive(Default)]
pub struct InMemoryWalletRepository {
    revisions: Mutex<HashMap<Uuid, BTreeMap<u64, WalletRevision>>>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored revisions across all wallets
    pub fn revision_count(&self) -> usize {
        self.revisions
            .lock()
            .map(|map| map.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Stored revisions of one wallet, oldest first
    pub fn revisions(&self, id: Uuid) -> Vec<WalletRevision> {
        self.revisions
            .lock()
            .map(|map| {
                map.get(&id)
                    .map(|history| history.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn find_wallet(&self, id: Uuid) -> StoreResult<Option<Wallet>> {
        let map = self
            .revisions
            .lock()
            .map_err(|_| StoreError::unavailable("store mutex poisoned"))?;

        let Some(history) = map.get(&id) else {
            return Ok(None);
        };
        let (Some((_, first)), Some((_, latest))) =
            (history.first_key_value(), history.last_key_value())
        else {
            return Ok(None);
        };

        Ok(Some(Wallet {
            id,
            balance: latest.balance,
            version: latest.version,
            created_at: Some(first.created_at),
            updated_at: Some(latest.created_at),
        }))
    }

    async fn insert_revision(&self, revision: &WalletRevision) -> StoreResult<()> {
        let mut map = self
            .revisions
            .lock()
            .map_err(|_| StoreError::unavailable("store mutex poisoned"))?;

        let duplicate_transaction = map
            .values()
            .flat_map(BTreeMap::values)
            .any(|existing| existing.transaction_id == revision.transaction_id);
        if duplicate_transaction {
            return Err(StoreError::unavailable(format!(
                "duplicate transaction id {}",
                revision.transaction_id
            )));
        }

        let history = map.entry(revision.wallet_id).or_default();
        if history.contains_key(&revision.version) {
            return Err(StoreError::VersionConflict {
                wallet_id: revision.wallet_id,
                version: revision.version,
            });
        }
        history.insert(revision.version, revision.clone());
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
