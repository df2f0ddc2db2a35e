//! Conflict classifier - separates stale writes from storage faults

use crate::domain::WalletError;
use crate::ports::StoreError;

/// What a failed conditional write means for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Another writer already committed this version
    VersionConflict,
    /// Anything else; never a conflict, never a success
    OtherFault,
}

/// Classify a store failure by its variant alone
pub fn classify(fault: &StoreError) -> FaultClass {
    match fault {
        StoreError::VersionConflict { .. } => FaultClass::VersionConflict,
        StoreError::Unavailable(_) => FaultClass::OtherFault,
    }
}

/// Translate a failed conditional write into the engine's error
pub fn into_wallet_error(fault: StoreError) -> WalletError {
    match (classify(&fault), fault) {
        (FaultClass::VersionConflict, StoreError::VersionConflict { wallet_id, version }) => {
            WalletError::OptimisticLock { wallet_id, version }
        }
        (_, other) => WalletError::Storage(other.to_string()),
    }
}
