//! Storage module for persisting crawler state
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - The visited-request ledger used for dedup
//! - The per-host cookie jar
//! - The durable FIFO request queue

mod lenient;
mod schema;
mod sqlite;
mod traits;

pub use lenient::LenientCookieJar;
pub use sqlite::SqliteStorage;
pub use traits::{cookie_host, QueueStorage, Storage, StorageError, StorageResult};

use crate::config::StorageConfig;

/// Builds a storage from configuration and initializes it
///
/// # Arguments
///
/// * `config` - Storage section of the loaded configuration
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Opened storage with the schema in place
/// * `Err(StorageError)` - Failed to open the database or create the schema
pub fn open_storage(config: &StorageConfig) -> StorageResult<SqliteStorage> {
    let storage = SqliteStorage::from_config(config.clone());
    storage.init()?;
    Ok(storage)
}
