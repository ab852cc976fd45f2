//! Sync ledger
//!
//! One row per logical source, recording the last date that source was
//! successfully ingested through. Advisory state only: the updater reads it
//! to decide where to resume, queries never consult it.

use crate::db::models::SyncEntry;
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

/// Record the most recent successfully ingested date for a source.
///
/// `last_date` never moves backward: re-running an old batch leaves the
/// ledger at the maximum date ever recorded. ISO dates compare
/// lexicographically, so MAX over the TEXT column is chronological.
pub fn advance(conn: &Connection, source: &str, last_date: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT INTO meta (source, last_date) VALUES (?1, ?2)
         ON CONFLICT (source) DO UPDATE SET
           last_date = MAX(last_date, excluded.last_date),
           updated_at = datetime('now')",
        params![source, last_date],
    )?;
    Ok(())
}

/// Last ingested date for a source, or None if it has never synced
pub fn last_date(conn: &Connection, source: &str) -> Result<Option<NaiveDate>> {
    let result = conn.query_row(
        "SELECT last_date FROM meta WHERE source = ?1",
        params![source],
        |row| row.get(0),
    );

    match result {
        Ok(date) => Ok(Some(date)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All ledger entries, ordered by source name
pub fn entries(conn: &Connection) -> Result<Vec<SyncEntry>> {
    let mut stmt =
        conn.prepare("SELECT source, last_date, updated_at FROM meta ORDER BY source")?;

    let entries = stmt
        .query_map([], |row| {
            Ok(SyncEntry {
                source: row.get(0)?,
                last_date: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn advance_then_get_returns_date() {
        let conn = test_db();

        advance(&conn, "moex", d("2024-01-02")).unwrap();
        assert_eq!(last_date(&conn, "moex").unwrap(), Some(d("2024-01-02")));
    }

    #[test]
    fn unknown_source_is_absent() {
        let conn = test_db();
        assert_eq!(last_date(&conn, "nonexistent").unwrap(), None);
    }

    #[test]
    fn ledger_never_moves_backward() {
        let conn = test_db();

        advance(&conn, "moex", d("2024-01-05")).unwrap();
        advance(&conn, "moex", d("2024-01-02")).unwrap();
        assert_eq!(last_date(&conn, "moex").unwrap(), Some(d("2024-01-05")));
    }

    #[test]
    fn ledger_equals_max_date_ever_advanced() {
        let conn = test_db();

        for date in ["2024-01-03", "2024-01-09", "2024-01-04", "2024-01-08"] {
            advance(&conn, "moex", d(date)).unwrap();
        }
        assert_eq!(last_date(&conn, "moex").unwrap(), Some(d("2024-01-09")));
    }

    #[test]
    fn sources_are_independent() {
        let conn = test_db();

        advance(&conn, "brent_history", d("2024-02-01")).unwrap();
        advance(&conn, "currency_history", d("2024-02-05")).unwrap();

        assert_eq!(
            last_date(&conn, "brent_history").unwrap(),
            Some(d("2024-02-01"))
        );
        assert_eq!(
            last_date(&conn, "currency_history").unwrap(),
            Some(d("2024-02-05"))
        );
    }

    #[test]
    fn entries_include_seeded_key_rates() {
        let conn = test_db();

        let all = entries(&conn).unwrap();
        let key_rates = all.iter().find(|e| e.source == "key_rates").unwrap();
        assert_eq!(key_rates.last_date, d("2024-10-25"));
    }
}
