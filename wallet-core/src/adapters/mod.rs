//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the WalletRepository port
//! - An in-memory map, for tests and throwaway servers

pub mod duckdb;
pub mod memory;
