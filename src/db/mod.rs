pub mod migrations;
pub mod repository;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// One SQLite connection shared between the CLI and background tasks.
/// Guards must never be held across an `.await`.
pub type SharedConn = Arc<Mutex<Connection>>;

pub fn share(conn: Connection) -> SharedConn {
    Arc::new(Mutex::new(conn))
}

pub fn lock(conn: &SharedConn) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| anyhow!("database lock poisoned"))
}

#[cfg(test)]
pub fn test_conn() -> SharedConn {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    migrations::run_migrations(&conn).expect("migrations");
    share(conn)
}
