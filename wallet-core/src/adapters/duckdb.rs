//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Wallet, WalletRevision};
use crate::ports::{StoreError, StoreResult, WalletRepository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Timestamps are stored as naive UTC
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Check if an error message indicates a file locking issue that should be retried
fn is_lock_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock on file")
        || lower.contains("database is locked")
}

/// DuckDB-backed balance store
///
/// Revisions are appended to `wallet_revisions`; the latest version of a
/// wallet is its current state. All statements run on tokio's blocking pool
/// behind a single shared connection.
pub struct DuckDbWalletRepository {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbWalletRepository {
    /// Open (or create) the database file at `db_path`.
    ///
    /// Retries with exponential backoff while another process holds the file
    /// lock, e.g. a CLI command started while `wallet serve` is shutting down.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(Some(db_path)) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_lock_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            path = %db_path.display(),
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(Self::try_open_connection(None)?)),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: Option<&Path>) -> Result<Connection> {
        // Extensions are never needed and autoloading reaches for ~/.duckdb
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = match db_path {
            Some(path) => Connection::open_with_flags(path, config)?,
            None => Connection::open_in_memory_with_flags(config)?,
        };
        Ok(conn)
    }

    /// Path of the backing file, None for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "database schema updated");
        }
        Ok(())
    }

    /// Total number of stored revisions across all wallets
    pub async fn revision_count(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM wallet_revisions", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count as u64)
            .map_err(unavailable)
        })
        .await
    }

    /// Stored revisions of one wallet, oldest first
    pub async fn revisions(&self, id: Uuid) -> StoreResult<Vec<WalletRevision>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT transaction_id, version::BIGINT, balance::VARCHAR, amount::VARCHAR,
                            kind, created_at::VARCHAR, metadata
                     FROM wallet_revisions
                     WHERE wallet_id = ?
                     ORDER BY version",
                )
                .map_err(unavailable)?;
            let mut rows = stmt.query([id.to_string()]).map_err(unavailable)?;

            let mut revisions = Vec::new();
            while let Some(row) = rows.next().map_err(unavailable)? {
                let transaction_id: String = row.get(0).map_err(unavailable)?;
                let version: i64 = row.get(1).map_err(unavailable)?;
                let balance: String = row.get(2).map_err(unavailable)?;
                let amount: String = row.get(3).map_err(unavailable)?;
                let kind: String = row.get(4).map_err(unavailable)?;
                let created_at: String = row.get(5).map_err(unavailable)?;
                let metadata: String = row.get(6).map_err(unavailable)?;

                revisions.push(WalletRevision {
                    wallet_id: id,
                    transaction_id: Uuid::parse_str(&transaction_id).map_err(unavailable)?,
                    version: u64::try_from(version).map_err(unavailable)?,
                    balance: parse_decimal(&balance)?,
                    amount: parse_decimal(&amount)?,
                    kind: kind.parse().map_err(unavailable)?,
                    created_at: parse_timestamp(&created_at)?,
                    metadata: serde_json::from_str(&metadata).map_err(unavailable)?,
                });
            }
            Ok(revisions)
        })
        .await
    }

    /// Run `f` against the shared connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::unavailable("database connection mutex poisoned"))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::unavailable(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl WalletRepository for DuckDbWalletRepository {
    async fn find_wallet(&self, id: Uuid) -> StoreResult<Option<Wallet>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT r.balance::VARCHAR, r.version::BIGINT, r.created_at::VARCHAR,
                            (SELECT MIN(f.created_at) FROM wallet_revisions f
                             WHERE f.wallet_id = r.wallet_id)::VARCHAR
                     FROM wallet_revisions r
                     WHERE r.wallet_id = ?
                     ORDER BY r.version DESC
                     LIMIT 1",
                )
                .map_err(unavailable)?;
            let mut rows = stmt.query([id.to_string()]).map_err(unavailable)?;

            let Some(row) = rows.next().map_err(unavailable)? else {
                return Ok(None);
            };
            let balance: String = row.get(0).map_err(unavailable)?;
            let version: i64 = row.get(1).map_err(unavailable)?;
            let updated_at: String = row.get(2).map_err(unavailable)?;
            let created_at: String = row.get(3).map_err(unavailable)?;

            Ok(Some(Wallet {
                id,
                balance: parse_decimal(&balance)?,
                version: u64::try_from(version).map_err(unavailable)?,
                created_at: Some(parse_timestamp(&created_at)?),
                updated_at: Some(parse_timestamp(&updated_at)?),
            }))
        })
        .await
    }

    async fn insert_revision(&self, revision: &WalletRevision) -> StoreResult<()> {
        let revision = revision.clone();
        let metadata = serde_json::to_string(&revision.metadata).map_err(unavailable)?;
        self.with_conn(move |conn| {
            // The primary key decides: a row that already exists is skipped, not
            // overwritten, and the affected-row count tells us which happened.
            let inserted = conn
                .execute(
                    "INSERT INTO wallet_revisions
                        (wallet_id, transaction_id, version, balance, amount, kind, created_at,
                         metadata)
                     VALUES (?, ?, ?, CAST(? AS DECIMAL(20, 2)), CAST(? AS DECIMAL(20, 2)), ?,
                             CAST(? AS TIMESTAMP), ?)
                     ON CONFLICT (wallet_id, version) DO NOTHING",
                    params![
                        revision.wallet_id.to_string(),
                        revision.transaction_id.to_string(),
                        revision.version as i64,
                        revision.balance.to_string(),
                        revision.amount.to_string(),
                        revision.kind.as_str(),
                        revision.created_at.naive_utc().format(TIMESTAMP_FORMAT).to_string(),
                        metadata,
                    ],
                )
                .map_err(unavailable)?;

            if inserted == 0 {
                return Err(StoreError::VersionConflict {
                    wallet_id: revision.wallet_id,
                    version: revision.version,
                });
            }
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
                .map(|_| ())
                .map_err(unavailable)
        })
        .await
    }
}

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::unavailable(e.to_string())
}

fn parse_decimal(s: &str) -> StoreResult<Decimal> {
    s.parse()
        .map_err(|e| StoreError::unavailable(format!("invalid stored balance {:?}: {}", s, e)))
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::unavailable(format!("invalid stored timestamp {:?}: {}", s, e)))
}
