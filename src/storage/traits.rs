//! Storage traits and error types
//!
//! This module defines the two interfaces a crawler consumes, [`Storage`] for
//! dedup and cookies and [`QueueStorage`] for the pending-request queue, and
//! the error type shared by their implementations.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open database at '{}': {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Schema error: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Storage is not initialized; call init() first")]
    NotInitialized,

    #[error("Storage is closed")]
    Closed,

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Visited-request ledger and per-host cookie jar
///
/// Implementations are shared between crawler threads, so every method
/// takes `&self` and does its own locking.
pub trait Storage: Send + Sync {
    /// Prepares the backend for use. Safe to call more than once.
    fn init(&self) -> StorageResult<()>;

    /// Records `request_id` as visited
    ///
    /// This is an append: recording the same id twice is allowed.
    fn visited(&self, request_id: u64) -> StorageResult<()>;

    /// Returns whether `request_id` has ever been recorded as visited
    fn is_visited(&self, request_id: u64) -> StorageResult<bool>;

    /// Stores the cookie string for `host`, replacing any previous value
    fn set_cookies(&self, host: &str, cookies: &str) -> StorageResult<()>;

    /// Returns the cookie string for `host`, or `None` if none is stored
    fn cookies(&self, host: &str) -> StorageResult<Option<String>>;

    /// Stores cookies for the host of `url`
    fn set_cookies_for(&self, url: &Url, cookies: &str) -> StorageResult<()> {
        self.set_cookies(&cookie_host(url)?, cookies)
    }

    /// Returns cookies for the host of `url`
    fn cookies_for(&self, url: &Url) -> StorageResult<Option<String>> {
        self.cookies(&cookie_host(url)?)
    }
}

/// Durable FIFO queue of opaque request payloads
pub trait QueueStorage: Send + Sync {
    /// Prepares the backend for use. Safe to call more than once.
    fn init(&self) -> StorageResult<()>;

    /// Appends a payload to the tail of the queue
    fn add_request(&self, payload: &[u8]) -> StorageResult<()>;

    /// Removes and returns the oldest payload, or `None` if the queue is empty
    ///
    /// Delivery is at-most-once: the entry is deleted before this returns, so
    /// a caller that fails to finish the work must re-enqueue it itself.
    fn get_request(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Number of queued payloads at the time of the call
    fn queue_size(&self) -> StorageResult<u64>;
}

impl<S: Storage + ?Sized> Storage for &S {
    fn init(&self) -> StorageResult<()> {
        (**self).init()
    }

    fn visited(&self, request_id: u64) -> StorageResult<()> {
        (**self).visited(request_id)
    }

    fn is_visited(&self, request_id: u64) -> StorageResult<bool> {
        (**self).is_visited(request_id)
    }

    fn set_cookies(&self, host: &str, cookies: &str) -> StorageResult<()> {
        (**self).set_cookies(host, cookies)
    }

    fn cookies(&self, host: &str) -> StorageResult<Option<String>> {
        (**self).cookies(host)
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn init(&self) -> StorageResult<()> {
        (**self).init()
    }

    fn visited(&self, request_id: u64) -> StorageResult<()> {
        (**self).visited(request_id)
    }

    fn is_visited(&self, request_id: u64) -> StorageResult<bool> {
        (**self).is_visited(request_id)
    }

    fn set_cookies(&self, host: &str, cookies: &str) -> StorageResult<()> {
        (**self).set_cookies(host, cookies)
    }

    fn cookies(&self, host: &str) -> StorageResult<Option<String>> {
        (**self).cookies(host)
    }
}

impl<S: QueueStorage + ?Sized> QueueStorage for &S {
    fn init(&self) -> StorageResult<()> {
        (**self).init()
    }

    fn add_request(&self, payload: &[u8]) -> StorageResult<()> {
        (**self).add_request(payload)
    }

    fn get_request(&self) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_request()
    }

    fn queue_size(&self) -> StorageResult<u64> {
        (**self).queue_size()
    }
}

impl<S: QueueStorage + ?Sized> QueueStorage for Arc<S> {
    fn init(&self) -> StorageResult<()> {
        (**self).init()
    }

    fn add_request(&self, payload: &[u8]) -> StorageResult<()> {
        (**self).add_request(payload)
    }

    fn get_request(&self) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_request()
    }

    fn queue_size(&self) -> StorageResult<u64> {
        (**self).queue_size()
    }
}

/// Host key used for cookie storage: the host plus any non-default port
///
/// An explicit default port is dropped, so `https://a.com:443/` keys as `a.com`.
pub fn cookie_host(url: &Url) -> StorageResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| StorageError::MissingHost(url.to_string()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
