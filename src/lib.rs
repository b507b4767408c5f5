//! crawl-store: durable crawler state on SQLite
//!
//! This crate gives a web crawler state that survives restarts: a ledger of
//! visited requests, a per-host cookie jar, and a FIFO queue of pending
//! requests. One [`storage::SqliteStorage`] is shared by every crawler
//! thread; the cookie jar and the queue each carry their own lock so
//! concurrent writers cannot lose updates or claim the same queue entry.

pub mod config;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for crawl-store operations
#[derive(Debug, Error)]
pub enum CrawlStoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for crawl-store operations
pub type Result<T> = std::result::Result<T, CrawlStoreError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use storage::{open_storage, QueueStorage, SqliteStorage, Storage, StorageError};
