//! Live market snapshot
//!
//! A single mutable record (id = 1), overwritten in place on every update
//! cycle. The CHECK constraint makes "one row" a schema fact rather than an
//! application convention.

use crate::db::models::{LiveQuote, LiveSnapshot};
use crate::error::Result;
use rusqlite::{params, Connection};

/// Overwrite the snapshot row, creating it on first write.
///
/// Every field is replaced and `updated_at` refreshed; no history is kept.
pub fn replace(conn: &Connection, quote: &LiveQuote) -> Result<()> {
    conn.execute(
        "INSERT INTO live_snapshot (id, last_price, open_price, high_price, low_price,
                                    cap, cap_trend, vol_today, val_today, num_trades,
                                    issue_size, update_time, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, datetime('now'))
         ON CONFLICT (id) DO UPDATE SET
           last_price = excluded.last_price,
           open_price = excluded.open_price,
           high_price = excluded.high_price,
           low_price = excluded.low_price,
           cap = excluded.cap,
           cap_trend = excluded.cap_trend,
           vol_today = excluded.vol_today,
           val_today = excluded.val_today,
           num_trades = excluded.num_trades,
           issue_size = excluded.issue_size,
           update_time = excluded.update_time,
           updated_at = datetime('now')",
        params![
            quote.last_price,
            quote.open_price,
            quote.high_price,
            quote.low_price,
            quote.cap,
            quote.cap_trend,
            quote.vol_today,
            quote.val_today,
            quote.num_trades,
            quote.issue_size,
            quote.update_time,
        ],
    )?;

    Ok(())
}

/// Current snapshot, or None before the first update cycle
pub fn get(conn: &Connection) -> Result<Option<LiveSnapshot>> {
    let result = conn.query_row(
        "SELECT last_price, open_price, high_price, low_price, cap, cap_trend,
                vol_today, val_today, num_trades, issue_size, update_time, updated_at
         FROM live_snapshot WHERE id = 1",
        [],
        |row| {
            Ok(LiveSnapshot {
                last_price: row.get(0)?,
                open_price: row.get(1)?,
                high_price: row.get(2)?,
                low_price: row.get(3)?,
                cap: row.get(4)?,
                cap_trend: row.get(5)?,
                vol_today: row.get(6)?,
                val_today: row.get(7)?,
                num_trades: row.get(8)?,
                issue_size: row.get(9)?,
                update_time: row.get(10)?,
                updated_at: row.get(11)?,
            })
        },
    );

    match result {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
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

    fn quote(last: f64) -> LiveQuote {
        LiveQuote {
            last_price: Some(last),
            open_price: Some(last - 2.0),
            high_price: Some(last + 1.0),
            low_price: Some(last - 3.0),
            cap: Some(450_000_000_000.0),
            cap_trend: Some(0.5),
            vol_today: Some(2_000_000),
            val_today: Some(last * 2_000_000.0),
            num_trades: Some(15_000),
            issue_size: Some(2_276_401_458),
            update_time: Some("18:45:00".to_string()),
        }
    }

    #[test]
    fn get_is_none_before_first_replace() {
        let conn = test_db();
        assert_eq!(get(&conn).unwrap(), None);
    }

    #[test]
    fn replace_keeps_exactly_one_row() {
        let conn = test_db();

        replace(&conn, &quote(210.0)).unwrap();
        replace(&conn, &quote(211.5)).unwrap();
        replace(&conn, &quote(209.9)).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM live_snapshot", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let snap = get(&conn).unwrap().unwrap();
        assert_eq!(snap.last_price, Some(209.9));
    }

    #[test]
    fn second_row_violates_check_constraint() {
        let conn = test_db();
        replace(&conn, &quote(210.0)).unwrap();

        let err = conn.execute(
            "INSERT INTO live_snapshot (id, last_price) VALUES (2, 215.0)",
            [],
        );
        assert!(err.is_err());
    }
}
