//! Repository port - balance store abstraction

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Wallet, WalletRevision};

/// Failure of a store call.
///
/// A version conflict is reported as its own variant by the conditional write
/// itself, so nobody has to inspect driver messages to tell it apart from an
/// ordinary fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Revision {version} of wallet {wallet_id} already exists")]
    VersionConflict { wallet_id: Uuid, version: u64 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Store result type
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable keyed storage of wallet revisions
///
/// Implementations must guarantee that two concurrent `insert_revision` calls
/// for the same `(wallet_id, version)` can never both succeed, and that
/// `find_wallet` reflects every committed revision (no stale caching).
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Latest committed state of a wallet, or None if it was never written
    async fn find_wallet(&self, id: Uuid) -> StoreResult<Option<Wallet>>;

    /// Append a revision, succeeding only if `(wallet_id, version)` is new
    async fn insert_revision(&self, revision: &WalletRevision) -> StoreResult<()>;

    /// Cheap connectivity check for health checks
    async fn ping(&self) -> StoreResult<()>;
}
