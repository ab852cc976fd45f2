//! SQLite connection utilities

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open the writer connection with WAL enabled
pub fn create_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    // WAL keeps readers unblocked while the updater commits
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

    Ok(conn)
}

/// Flags for anonymous reader connections; SQLite itself rejects any
/// INSERT/UPDATE/DELETE issued through a connection opened this way.
pub fn read_only_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI
}

/// Open a single read-only connection
pub fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(path, read_only_flags())
}
