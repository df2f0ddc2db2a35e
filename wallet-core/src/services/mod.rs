//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod conflict;
pub mod migration;
pub mod retry;
mod wallet;

pub use conflict::{classify, FaultClass};
pub use migration::{MigrationResult, MigrationService};
pub use retry::{with_retry, DEFAULT_MAX_RETRIES};
pub use wallet::WalletService;
