//! Statistics over the crawl store
//!
//! This module extracts point-in-time counters from the storage layer and
//! displays them. The numbers are approximate while crawler threads are
//! still writing; use them for monitoring, not for control flow.

use crate::storage::{QueueStorage, SqliteStorage, StorageResult};
use std::fmt;

/// Crawl store statistics summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Distinct request ids in the visited ledger
    pub visited_requests: u64,

    /// Hosts with a stored cookie string
    pub cookie_hosts: u64,

    /// Payloads waiting in the request queue
    pub queued_requests: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - An initialized storage backend
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        visited_requests: storage.count_visited()?,
        cookie_hosts: storage.count_cookie_hosts()?,
        queued_requests: storage.queue_size()?,
    })
}

impl fmt::Display for StoreStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Store Statistics ===")?;
        writeln!(f)?;
        writeln!(f, "  Visited requests: {}", self.visited_requests)?;
        writeln!(f, "  Hosts with cookies: {}", self.cookie_hosts)?;
        write!(f, "  Queued requests: {}", self.queued_requests)
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("{}", stats);
}
