//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the [`Storage`] and
//! [`QueueStorage`] traits.
//!
//! One connection serves every thread. On top of the connection mutex there
//! are two lock domains: the cookie jar (`RwLock`, writers exclusive) and the
//! queue (`Mutex`, held across the claim of the oldest entry). Locks are always
//! taken in the order domain lock, then connection.

use crate::config::StorageConfig;
use crate::storage::schema::{drop_schema, initialize_schema};
use crate::storage::traits::{QueueStorage, Storage, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Connection state guarded by the connection mutex
#[derive(Default)]
struct Inner {
    conn: Option<Connection>,
    /// Schema exists; cleared by `clear()`
    ready: bool,
    closed: bool,
}

impl Inner {
    fn missing(&self) -> StorageError {
        if self.closed {
            StorageError::Closed
        } else {
            StorageError::NotInitialized
        }
    }

    fn ready_conn(&self) -> StorageResult<&Connection> {
        match &self.conn {
            Some(conn) if self.ready => Ok(conn),
            Some(_) => Err(StorageError::NotInitialized),
            None => Err(self.missing()),
        }
    }

    fn conn_mut(&mut self) -> StorageResult<&mut Connection> {
        let missing = self.missing();
        self.conn.as_mut().ok_or(missing)
    }
}

/// SQLite storage backend
///
/// Construct with [`SqliteStorage::new`], [`SqliteStorage::in_memory`] or
/// [`SqliteStorage::from_config`], then call [`SqliteStorage::init`] before
/// use. The value is `Send + Sync`; share it between crawler threads by
/// reference or through an `Arc`.
pub struct SqliteStorage {
    config: StorageConfig,
    inner: Mutex<Inner>,
    cookie_lock: RwLock<()>,
    queue_lock: Mutex<()>,
}

impl SqliteStorage {
    /// Creates a storage backed by the database file at `path`
    ///
    /// Nothing is opened until [`SqliteStorage::init`] is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_config(StorageConfig::new(
            path.as_ref().to_string_lossy().into_owned(),
        ))
    }

    /// Creates a storage backed by a private in-memory database
    ///
    /// The data lives only as long as the connection, so `close()` followed
    /// by `init()` yields an empty store.
    pub fn in_memory() -> Self {
        Self::from_config(StorageConfig::new(crate::config::IN_MEMORY_PATH))
    }

    /// Creates a storage from a loaded configuration
    pub fn from_config(config: StorageConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
            cookie_lock: RwLock::new(()),
            queue_lock: Mutex::new(()),
        }
    }

    /// The configured database path
    pub fn path(&self) -> &str {
        &self.config.database_path
    }

    /// Whether a connection is currently open
    pub fn is_open(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.conn.is_some())
            .unwrap_or(false)
    }

    /// Opens the database if needed and creates the schema
    ///
    /// Idempotent: tables and indexes are created with `IF NOT EXISTS`, and an
    /// already open connection is reused. After [`SqliteStorage::close`] this
    /// reopens the database.
    pub fn init(&self) -> StorageResult<()> {
        let mut inner = self.lock_inner()?;

        let conn = match inner.conn.take() {
            Some(conn) => conn,
            None => {
                let conn = self.open_connection()?;
                info!("Opened crawl store at {}", self.config.database_path);
                conn
            }
        };

        let result = initialize_schema(&conn);
        inner.conn = Some(conn);
        inner.closed = false;
        inner.ready = false;
        result.map_err(StorageError::Schema)?;
        inner.ready = true;

        debug!("Crawl store schema ready");
        Ok(())
    }

    /// Drops every table, decommissioning the store
    ///
    /// Takes both lock domains exclusively. Afterwards every data operation
    /// fails with [`StorageError::NotInitialized`] until `init()` is called
    /// again. Clearing an already cleared store succeeds.
    pub fn clear(&self) -> StorageResult<()> {
        let _cookies = self.write_cookies()?;
        let _queue = self.lock_queue()?;
        let mut inner = self.lock_inner()?;

        drop_schema(inner.conn_mut()?).map_err(StorageError::Schema)?;
        inner.ready = false;

        info!("Cleared crawl store at {}", self.config.database_path);
        Ok(())
    }

    /// Drops every table and recreates an empty schema
    pub fn reset(&self) -> StorageResult<()> {
        self.clear()?;
        self.init()
    }

    /// Closes the connection
    ///
    /// Every later operation fails with [`StorageError::Closed`] until
    /// `init()` reopens the database. Closing twice is a no-op.
    pub fn close(&self) -> StorageResult<()> {
        let mut inner = self.lock_inner()?;
        inner.ready = false;
        inner.closed = true;

        if let Some(conn) = inner.conn.take() {
            conn.close().map_err(|(_, source)| StorageError::Query(source))?;
            info!("Closed crawl store at {}", self.config.database_path);
        }

        Ok(())
    }

    /// Counts distinct request ids in the visited ledger
    pub fn count_visited(&self) -> StorageResult<u64> {
        let count: i64 = self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(DISTINCT request_id) FROM visited", [], |row| {
                row.get(0)
            })
        })?;
        Ok(count as u64)
    }

    /// Counts hosts with stored cookies
    pub fn count_cookie_hosts(&self) -> StorageResult<u64> {
        let _guard = self.read_cookies()?;
        let count: i64 = self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM cookies", [], |row| row.get(0))
        })?;
        Ok(count as u64)
    }

    fn open_connection(&self) -> StorageResult<Connection> {
        let path = PathBuf::from(&self.config.database_path);
        let connection_error = |source: rusqlite::Error| StorageError::Connection {
            path: path.clone(),
            source,
        };

        let conn = if self.config.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&path)
        }
        .map_err(connection_error)?;

        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(connection_error)?;

        conn.execute_batch(&format!(
            "
            PRAGMA journal_mode = {};
            PRAGMA synchronous = {};
            PRAGMA temp_store = MEMORY;
            ",
            self.config.journal_mode.as_pragma(),
            self.config.synchronous.as_pragma(),
        ))
        .map_err(connection_error)?;

        // Ping
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(connection_error)?;

        Ok(conn)
    }

    fn lock_inner(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::LockPoisoned("connection"))
    }

    fn read_cookies(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, ()>> {
        self.cookie_lock
            .read()
            .map_err(|_| StorageError::LockPoisoned("cookie jar"))
    }

    fn write_cookies(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, ()>> {
        self.cookie_lock
            .write()
            .map_err(|_| StorageError::LockPoisoned("cookie jar"))
    }

    fn lock_queue(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.queue_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned("request queue"))
    }

    /// Runs one statement against the initialized connection
    fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StorageResult<T> {
        let inner = self.lock_inner()?;
        let conn = inner.ready_conn()?;
        Ok(op(conn)?)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.config.database_path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// SQLite INTEGER is signed; request ids use the full `u64` range, so they
/// are stored bit-for-bit as `i64`.
fn request_id_to_db(request_id: u64) -> i64 {
    request_id as i64
}

impl Storage for SqliteStorage {
    fn init(&self) -> StorageResult<()> {
        SqliteStorage::init(self)
    }

    // ===== Visited Ledger =====

    fn visited(&self, request_id: u64) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.prepare_cached("INSERT INTO visited (request_id, visited) VALUES (?1, 1)")?
                .execute(params![request_id_to_db(request_id)])
        })?;
        debug!(request_id, "Recorded visited request");
        Ok(())
    }

    fn is_visited(&self, request_id: u64) -> StorageResult<bool> {
        let visited: bool = self.with_conn(|conn| {
            conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM visited WHERE request_id = ?1)")?
                .query_row(params![request_id_to_db(request_id)], |row| row.get(0))
        })?;
        Ok(visited)
    }

    // ===== Cookie Jar =====

    fn set_cookies(&self, host: &str, cookies: &str) -> StorageResult<()> {
        let _guard = self.write_cookies()?;
        let now = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            conn.prepare_cached(
                "INSERT INTO cookies (host, cookies, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(host) DO UPDATE SET cookies = excluded.cookies, updated_at = excluded.updated_at",
            )?
            .execute(params![host, cookies, now])
        })?;

        debug!(host, "Stored cookies");
        Ok(())
    }

    fn cookies(&self, host: &str) -> StorageResult<Option<String>> {
        let _guard = self.read_cookies()?;

        let cookies: Option<String> = self.with_conn(|conn| {
            conn.prepare_cached("SELECT cookies FROM cookies WHERE host = ?1")?
                .query_row(params![host], |row| row.get(0))
                .optional()
        })?;

        Ok(cookies)
    }
}

impl QueueStorage for SqliteStorage {
    fn init(&self) -> StorageResult<()> {
        SqliteStorage::init(self)
    }

    fn add_request(&self, payload: &[u8]) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.prepare_cached("INSERT INTO queue (data) VALUES (?1)")?
                .execute(params![payload])
        })?;
        debug!(bytes = payload.len(), "Enqueued request");
        Ok(())
    }

    fn get_request(&self) -> StorageResult<Option<Vec<u8>>> {
        let _guard = self.lock_queue()?;

        // Select and delete in one statement so no other connection can claim
        // the same row in between.
        let payload: Option<Vec<u8>> = self.with_conn(|conn| {
            conn.prepare_cached(
                "DELETE FROM queue WHERE id = (SELECT MIN(id) FROM queue) RETURNING data",
            )?
            .query_row([], |row| row.get(0))
            .optional()
        })?;

        if let Some(payload) = &payload {
            debug!(bytes = payload.len(), "Dequeued request");
        }
        Ok(payload)
    }

    fn queue_size(&self) -> StorageResult<u64> {
        let count: i64 = self.with_conn(|conn| {
            conn.prepare_cached("SELECT COUNT(*) FROM queue")?
                .query_row([], |row| row.get(0))
        })?;
        Ok(count as u64)
    }
}
