//! MOEX stock daily OHLCV history
//!
//! Append-mostly series keyed by trade date. Today's in-progress bar may be
//! upserted repeatedly until market close; older bars are immutable in
//! normal operation.

use crate::db::models::StockBar;
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

/// Upsert daily bars, keyed by trade_date.
///
/// Idempotent: re-writing an existing date replaces the value columns and
/// never duplicates the row. Callers batching multiple bars should run this
/// inside a transaction (see `MarketDb::upsert_stock_bars`).
pub fn upsert_bars(conn: &Connection, bars: &[StockBar]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO stock_history (trade_date, open, high, low, close, volume, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (trade_date) DO UPDATE SET
           open = excluded.open, high = excluded.high, low = excluded.low,
           close = excluded.close, volume = excluded.volume, value = excluded.value",
    )?;

    for bar in bars {
        super::require_positive("close", bar.close)?;
        stmt.execute(params![
            bar.trade_date,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            bar.value,
        ])?;
    }

    Ok(bars.len())
}

/// Bars in [from, to], ordered by trade date ascending
pub fn range(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<Vec<StockBar>> {
    let mut stmt = conn.prepare(
        "SELECT trade_date, open, high, low, close, volume, value
         FROM stock_history
         WHERE trade_date >= ?1 AND trade_date <= ?2
         ORDER BY trade_date ASC",
    )?;

    let bars = stmt
        .query_map(params![from, to], |row| {
            Ok(StockBar {
                trade_date: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                volume: row.get(5)?,
                value: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(bars)
}

/// Most recent bar, or None if the table is empty
pub fn latest(conn: &Connection) -> Result<Option<StockBar>> {
    let result = conn.query_row(
        "SELECT trade_date, open, high, low, close, volume, value
         FROM stock_history
         ORDER BY trade_date DESC LIMIT 1",
        [],
        |row| {
            Ok(StockBar {
                trade_date: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                volume: row.get(5)?,
                value: row.get(6)?,
            })
        },
    );

    match result {
        Ok(bar) => Ok(Some(bar)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use crate::error::StoreError;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn bar(date: &str, close: f64) -> StockBar {
        StockBar {
            trade_date: d(date),
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close,
            volume: Some(1_000_000),
            value: Some(close * 1_000_000.0),
        }
    }

    #[test]
    fn upsert_replaces_existing_bar() {
        let conn = test_db();

        upsert_bars(&conn, &[bar("2024-01-02", 100.5)]).unwrap();
        upsert_bars(&conn, &[bar("2024-01-02", 101.0)]).unwrap();

        let bars = range(&conn, d("2024-01-01"), d("2024-01-31")).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 101.0);
    }

    #[test]
    fn upsert_is_idempotent() {
        let conn = test_db();
        let b = bar("2024-01-02", 100.5);

        upsert_bars(&conn, &[b.clone()]).unwrap();
        upsert_bars(&conn, &[b.clone()]).unwrap();

        let bars = range(&conn, d("2024-01-01"), d("2024-01-31")).unwrap();
        assert_eq!(bars, vec![b]);
    }

    #[test]
    fn null_close_rejected_and_table_unchanged() {
        let conn = test_db();

        let err = conn.execute(
            "INSERT INTO stock_history (trade_date, close) VALUES ('2024-01-02', NULL)",
            [],
        );
        assert!(err.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM stock_history", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn non_positive_close_fails_validation() {
        let conn = test_db();

        let err = upsert_bars(&conn, &[bar("2024-01-02", 0.0)]).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn partial_bar_stores_with_missing_components() {
        let conn = test_db();
        let thin = StockBar {
            trade_date: d("2024-01-03"),
            open: None,
            high: None,
            low: None,
            close: 99.8,
            volume: None,
            value: None,
        };

        upsert_bars(&conn, &[thin.clone()]).unwrap();
        assert_eq!(latest(&conn).unwrap(), Some(thin));
    }

    #[test]
    fn range_is_ordered_ascending() {
        let conn = test_db();

        upsert_bars(
            &conn,
            &[
                bar("2024-01-04", 103.0),
                bar("2024-01-02", 101.0),
                bar("2024-01-03", 102.0),
            ],
        )
        .unwrap();

        let bars = range(&conn, d("2024-01-02"), d("2024-01-03")).unwrap();
        let dates: Vec<_> = bars.iter().map(|b| b.trade_date).collect();
        assert_eq!(dates, vec![d("2024-01-02"), d("2024-01-03")]);
    }

    #[test]
    fn latest_returns_maximum_date() {
        let conn = test_db();
        assert_eq!(latest(&conn).unwrap(), None);

        upsert_bars(&conn, &[bar("2024-01-02", 101.0), bar("2024-01-05", 104.0)]).unwrap();
        assert_eq!(latest(&conn).unwrap().unwrap().trade_date, d("2024-01-05"));
    }
}
