//! Wallet domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::operations::MONEY_SCALE;

/// The balance of a single account at its current version.
///
/// `version` is the optimistic concurrency token: it starts at 0 for a wallet
/// that has never been written and grows by exactly one per committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub balance: Decimal,
    pub version: u64,
    /// Time of the first committed revision (None until materialized)
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the latest committed revision (None until materialized)
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wallet {
    /// Zero-balance wallet at version 0, used when the store has no record
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            balance: Decimal::new(0, MONEY_SCALE),
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// True once at least one revision has been committed
    pub fn is_materialized(&self) -> bool {
        self.version > 0
    }
}

/// Which mutation produced a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationKind {
    Credit,
    Debit,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Credit => "CREDIT",
            MutationKind::Debit => "DEBIT",
        }
    }
}

impl std::str::FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(MutationKind::Credit),
            "DEBIT" => Ok(MutationKind::Debit),
            other => Err(format!("unknown mutation kind: {}", other)),
        }
    }
}

/// Where a mutation came from; stored as JSON next to each revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RevisionMetadata {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            request_id: None,
            source: Some(source.into()),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// A new revision of a wallet, as handed to the store's conditional write.
///
/// `version` is the *next* version; the write must fail if a revision with the
/// same `(wallet_id, version)` already exists. `transaction_id` is unique
/// across all revisions of all wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRevision {
    pub wallet_id: Uuid,
    pub transaction_id: Uuid,
    pub version: u64,
    pub balance: Decimal,
    pub amount: Decimal,
    pub kind: MutationKind,
    pub created_at: DateTime<Utc>,
    pub metadata: RevisionMetadata,
}

impl WalletRevision {
    /// Build the revision that follows `current` with the given new balance
    pub fn next(current: &Wallet, balance: Decimal, amount: Decimal, kind: MutationKind) -> Self {
        Self {
            wallet_id: current.id,
            transaction_id: Uuid::new_v4(),
            version: current.version + 1,
            balance,
            amount,
            kind,
            created_at: Utc::now(),
            metadata: RevisionMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: RevisionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The wallet as it reads once this revision is committed
    pub fn into_wallet(self, previous: &Wallet) -> Wallet {
        Wallet {
            id: self.wallet_id,
            balance: self.balance,
            version: self.version,
            created_at: previous.created_at.or(Some(self.created_at)),
            updated_at: Some(self.created_at),
        }
    }
}

/// Outcome of a committed credit or debit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub transaction_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Receipt {
    pub fn new(revision: WalletRevision, previous: &Wallet) -> Self {
        let transaction_id = revision.transaction_id;
        let request_id = revision.metadata.request_id.clone();
        Self {
            wallet: revision.into_wallet(previous),
            transaction_id,
            request_id,
        }
    }
}
