//! Core domain entities
//!
//! The wallet entity, its revisions, and the pure balance rules. No I/O or
//! storage concerns live here.

mod wallet;
pub mod operations;
pub mod result;

pub use wallet::{MutationKind, Receipt, RevisionMetadata, Wallet, WalletRevision};
pub use result::{ErrorKind, WalletError};
