//! Database schema definitions
//!
//! This module contains the SQL schema for the visited ledger, the cookie jar
//! and the request queue.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Requests the crawler has already processed
CREATE TABLE IF NOT EXISTS visited (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id INTEGER NOT NULL,
    visited INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_visited_request_id ON visited(request_id);

-- One cookie string per host
CREATE TABLE IF NOT EXISTS cookies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host TEXT NOT NULL,
    cookies TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_cookies_host ON cookies(host);

-- Pending requests, oldest first by id
CREATE TABLE IF NOT EXISTS queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data BLOB NOT NULL
);
"#;

/// SQL that drops every table created by [`SCHEMA_SQL`]
pub const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS visited;
DROP TABLE IF EXISTS cookies;
DROP TABLE IF EXISTS queue;
"#;

/// Tables owned by the store
pub const TABLES: [&str; 3] = ["visited", "cookies", "queue"];

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Drops all store tables inside one transaction
pub fn drop_schema(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(DROP_SQL)?;
    tx.commit()
}
