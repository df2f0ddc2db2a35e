//! Wallet Core - optimistic-concurrency balance engine
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Wallet, revisions, balance arithmetic and errors
//! - **ports**: The WalletRepository trait the engine depends on
//! - **services**: The wallet engine, conflict classification, retry, migrations
//! - **adapters**: DuckDB and in-memory stores

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbWalletRepository;
use config::Config;
use ports::WalletRepository;
use services::WalletService;

// Re-export commonly used types at crate root
pub use domain::result::{OperationResult, WalletError};
pub use domain::{ErrorKind, Wallet};

/// Database file inside the wallet directory
pub const DB_FILENAME: &str = "wallet.duckdb";

/// Main context for wallet operations
///
/// Holds the configuration, the store and the engine built on top of it.
pub struct WalletContext {
    pub config: Config,
    pub repository: Arc<dyn WalletRepository>,
    pub wallet_service: WalletService,
}

impl WalletContext {
    /// Open the wallet directory: load settings, open the database, migrate
    pub fn new(wallet_dir: &Path) -> Result<Self> {
        let config = Config::load(wallet_dir).context("Failed to load configuration")?;

        let db_path = wallet_dir.join(DB_FILENAME);
        let repository = DuckDbWalletRepository::new(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        repository.ensure_schema()?;

        Ok(Self::with_repository(config, Arc::new(repository)))
    }

    /// Build a context around an already-constructed store
    pub fn with_repository(config: Config, repository: Arc<dyn WalletRepository>) -> Self {
        let wallet_service = WalletService::new(Arc::clone(&repository));
        Self {
            config,
            repository,
            wallet_service,
        }
    }
}
