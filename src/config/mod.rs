//! Configuration module for crawl-store
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_store::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-store.toml")).unwrap();
//! println!("State database: {}", config.storage.database_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, JournalMode, StorageConfig, Synchronous, IN_MEMORY_PATH};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::MAX_BUSY_TIMEOUT_MS;
