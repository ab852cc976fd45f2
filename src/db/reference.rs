//! Cross-market reference series
//!
//! Index, currency and global-exchange tables multiplex several logical
//! series through a discriminator column (ticker or pair) with no catalog
//! behind it; which values are valid is the updater's contract. Brent,
//! trading volumes and the key-rate step series are single-instrument.

use crate::db::models::{
    ClosePoint, CurrencyClose, ExchangeClose, IndexClose, KeyRate, VolumePoint,
};
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

// ============================================================================
// Multiplexed close series (shared helpers)
// ============================================================================

fn upsert_keyed_closes<'a, I>(conn: &Connection, sql: &str, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a str, NaiveDate, f64)>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut count = 0;

    for (key, trade_date, close) in rows {
        super::require_positive("close", close)?;
        stmt.execute(params![key, trade_date, close])?;
        count += 1;
    }

    Ok(count)
}

fn keyed_range(
    conn: &Connection,
    sql: &str,
    key: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ClosePoint>> {
    let mut stmt = conn.prepare(sql)?;

    let points = stmt
        .query_map(params![key, from, to], |row| {
            Ok(ClosePoint {
                trade_date: row.get(0)?,
                close: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(points)
}

fn keyed_latest(conn: &Connection, sql: &str, key: &str) -> Result<Option<ClosePoint>> {
    let result = conn.query_row(sql, params![key], |row| {
        Ok(ClosePoint {
            trade_date: row.get(0)?,
            close: row.get(1)?,
        })
    });

    match result {
        Ok(point) => Ok(Some(point)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn distinct_keys(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;

    let keys = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(keys)
}

// ============================================================================
// Index history (IMOEX, RTSI, ...)
// ============================================================================

/// Upsert index closes; rows for different tickers coexist independently
pub fn upsert_index_closes(conn: &Connection, rows: &[IndexClose]) -> Result<usize> {
    upsert_keyed_closes(
        conn,
        "INSERT INTO index_history (ticker, trade_date, close) VALUES (?1, ?2, ?3)
         ON CONFLICT (ticker, trade_date) DO UPDATE SET close = excluded.close",
        rows.iter().map(|r| (r.ticker.as_str(), r.trade_date, r.close)),
    )
}

/// Closes of one index in [from, to], ordered by trade date ascending
pub fn index_range(
    conn: &Connection,
    ticker: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ClosePoint>> {
    keyed_range(
        conn,
        "SELECT trade_date, close FROM index_history
         WHERE ticker = ?1 AND trade_date >= ?2 AND trade_date <= ?3
         ORDER BY trade_date ASC",
        ticker,
        from,
        to,
    )
}

/// Most recent close of one index
pub fn latest_index_close(conn: &Connection, ticker: &str) -> Result<Option<ClosePoint>> {
    keyed_latest(
        conn,
        "SELECT trade_date, close FROM index_history
         WHERE ticker = ?1 ORDER BY trade_date DESC LIMIT 1",
        ticker,
    )
}

/// Tickers present in the index table
pub fn index_tickers(conn: &Connection) -> Result<Vec<String>> {
    distinct_keys(
        conn,
        "SELECT DISTINCT ticker FROM index_history ORDER BY ticker",
    )
}

// ============================================================================
// Currency history (USD/RUB, ...)
// ============================================================================

/// Upsert currency closes keyed by (pair, trade_date)
pub fn upsert_currency_closes(conn: &Connection, rows: &[CurrencyClose]) -> Result<usize> {
    upsert_keyed_closes(
        conn,
        "INSERT INTO currency_history (pair, trade_date, close) VALUES (?1, ?2, ?3)
         ON CONFLICT (pair, trade_date) DO UPDATE SET close = excluded.close",
        rows.iter().map(|r| (r.pair.as_str(), r.trade_date, r.close)),
    )
}

/// Closes of one pair in [from, to], ordered by trade date ascending
pub fn currency_range(
    conn: &Connection,
    pair: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ClosePoint>> {
    keyed_range(
        conn,
        "SELECT trade_date, close FROM currency_history
         WHERE pair = ?1 AND trade_date >= ?2 AND trade_date <= ?3
         ORDER BY trade_date ASC",
        pair,
        from,
        to,
    )
}

/// Most recent close of one pair
pub fn latest_currency_close(conn: &Connection, pair: &str) -> Result<Option<ClosePoint>> {
    keyed_latest(
        conn,
        "SELECT trade_date, close FROM currency_history
         WHERE pair = ?1 ORDER BY trade_date DESC LIMIT 1",
        pair,
    )
}

/// Pairs present in the currency table
pub fn currency_pairs(conn: &Connection) -> Result<Vec<String>> {
    distinct_keys(
        conn,
        "SELECT DISTINCT pair FROM currency_history ORDER BY pair",
    )
}

// ============================================================================
// Global exchanges (ICE, CME, HKEX, LSEG, DB1, ...)
// ============================================================================

/// Upsert foreign exchange-operator closes keyed by (ticker, trade_date)
pub fn upsert_exchange_closes(conn: &Connection, rows: &[ExchangeClose]) -> Result<usize> {
    upsert_keyed_closes(
        conn,
        "INSERT INTO global_exchanges (ticker, trade_date, close) VALUES (?1, ?2, ?3)
         ON CONFLICT (ticker, trade_date) DO UPDATE SET close = excluded.close",
        rows.iter().map(|r| (r.ticker.as_str(), r.trade_date, r.close)),
    )
}

/// Closes of one exchange operator in [from, to], ascending
pub fn exchange_range(
    conn: &Connection,
    ticker: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ClosePoint>> {
    keyed_range(
        conn,
        "SELECT trade_date, close FROM global_exchanges
         WHERE ticker = ?1 AND trade_date >= ?2 AND trade_date <= ?3
         ORDER BY trade_date ASC",
        ticker,
        from,
        to,
    )
}

/// Most recent close of one exchange operator
pub fn latest_exchange_close(conn: &Connection, ticker: &str) -> Result<Option<ClosePoint>> {
    keyed_latest(
        conn,
        "SELECT trade_date, close FROM global_exchanges
         WHERE ticker = ?1 ORDER BY trade_date DESC LIMIT 1",
        ticker,
    )
}

/// Tickers present in the global exchanges table
pub fn exchange_tickers(conn: &Connection) -> Result<Vec<String>> {
    distinct_keys(
        conn,
        "SELECT DISTINCT ticker FROM global_exchanges ORDER BY ticker",
    )
}

// ============================================================================
// Brent crude
// ============================================================================

/// Upsert Brent closes keyed by trade date
pub fn upsert_brent_closes(conn: &Connection, rows: &[ClosePoint]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO brent_history (trade_date, close) VALUES (?1, ?2)
         ON CONFLICT (trade_date) DO UPDATE SET close = excluded.close",
    )?;

    for row in rows {
        super::require_positive("close", row.close)?;
        stmt.execute(params![row.trade_date, row.close])?;
    }

    Ok(rows.len())
}

/// Brent closes in [from, to], ordered by trade date ascending
pub fn brent_range(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClosePoint>> {
    let mut stmt = conn.prepare(
        "SELECT trade_date, close FROM brent_history
         WHERE trade_date >= ?1 AND trade_date <= ?2
         ORDER BY trade_date ASC",
    )?;

    let points = stmt
        .query_map(params![from, to], |row| {
            Ok(ClosePoint {
                trade_date: row.get(0)?,
                close: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(points)
}

/// Most recent Brent close
pub fn latest_brent_close(conn: &Connection) -> Result<Option<ClosePoint>> {
    let result = conn.query_row(
        "SELECT trade_date, close FROM brent_history ORDER BY trade_date DESC LIMIT 1",
        [],
        |row| {
            Ok(ClosePoint {
                trade_date: row.get(0)?,
                close: row.get(1)?,
            })
        },
    );

    match result {
        Ok(point) => Ok(Some(point)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Trading volumes (market-wide, independent of stock bar volume)
// ============================================================================

/// Upsert market-wide trading values keyed by trade date
pub fn upsert_trading_volumes(conn: &Connection, rows: &[VolumePoint]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO trading_volumes (trade_date, value) VALUES (?1, ?2)
         ON CONFLICT (trade_date) DO UPDATE SET value = excluded.value",
    )?;

    for row in rows {
        super::require_positive("value", row.value)?;
        stmt.execute(params![row.trade_date, row.value])?;
    }

    Ok(rows.len())
}

/// Trading values in [from, to], ordered by trade date ascending
pub fn trading_volume_range(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<VolumePoint>> {
    let mut stmt = conn.prepare(
        "SELECT trade_date, value FROM trading_volumes
         WHERE trade_date >= ?1 AND trade_date <= ?2
         ORDER BY trade_date ASC",
    )?;

    let points = stmt
        .query_map(params![from, to], |row| {
            Ok(VolumePoint {
                trade_date: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(points)
}

/// Most recent market-wide trading value
pub fn latest_trading_volume(conn: &Connection) -> Result<Option<VolumePoint>> {
    let result = conn.query_row(
        "SELECT trade_date, value FROM trading_volumes ORDER BY trade_date DESC LIMIT 1",
        [],
        |row| {
            Ok(VolumePoint {
                trade_date: row.get(0)?,
                value: row.get(1)?,
            })
        },
    );

    match result {
        Ok(point) => Ok(Some(point)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Key rates (step series)
// ============================================================================

/// Upsert key-rate changes keyed by effective date
pub fn upsert_key_rates(conn: &Connection, rows: &[KeyRate]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO key_rates (effective_date, rate) VALUES (?1, ?2)
         ON CONFLICT (effective_date) DO UPDATE SET rate = excluded.rate",
    )?;

    for row in rows {
        super::require_positive("rate", row.rate)?;
        stmt.execute(params![row.effective_date, row.rate])?;
    }

    Ok(rows.len())
}

/// All key-rate changes, ordered by effective date ascending
pub fn key_rates(conn: &Connection) -> Result<Vec<KeyRate>> {
    let mut stmt = conn
        .prepare("SELECT effective_date, rate FROM key_rates ORDER BY effective_date ASC")?;

    let rates = stmt
        .query_map([], |row| {
            Ok(KeyRate {
                effective_date: row.get(0)?,
                rate: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rates)
}

/// Rate in effect on a date: the latest change at or before it
pub fn key_rate_on(conn: &Connection, date: NaiveDate) -> Result<Option<f64>> {
    let result = conn.query_row(
        "SELECT rate FROM key_rates
         WHERE effective_date <= ?1
         ORDER BY effective_date DESC LIMIT 1",
        params![date],
        |row| row.get(0),
    );

    match result {
        Ok(rate) => Ok(Some(rate)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Most recent key-rate change
pub fn latest_key_rate(conn: &Connection) -> Result<Option<KeyRate>> {
    let result = conn.query_row(
        "SELECT effective_date, rate FROM key_rates ORDER BY effective_date DESC LIMIT 1",
        [],
        |row| {
            Ok(KeyRate {
                effective_date: row.get(0)?,
                rate: row.get(1)?,
            })
        },
    );

    match result {
        Ok(rate) => Ok(Some(rate)),
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

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn idx(ticker: &str, date: &str, close: f64) -> IndexClose {
        IndexClose {
            ticker: ticker.to_string(),
            trade_date: d(date),
            close,
        }
    }

    #[test]
    fn composite_key_series_coexist_on_same_date() {
        let conn = test_db();

        upsert_index_closes(
            &conn,
            &[
                idx("IMOEX", "2024-01-02", 3500.0),
                idx("RTSI", "2024-01-02", 1100.0),
            ],
        )
        .unwrap();

        assert_eq!(
            latest_index_close(&conn, "IMOEX").unwrap().unwrap().close,
            3500.0
        );
        assert_eq!(
            latest_index_close(&conn, "RTSI").unwrap().unwrap().close,
            1100.0
        );
        assert_eq!(index_tickers(&conn).unwrap(), vec!["IMOEX", "RTSI"]);
    }

    #[test]
    fn index_upsert_replaces_only_matching_series() {
        let conn = test_db();

        upsert_index_closes(
            &conn,
            &[
                idx("IMOEX", "2024-01-02", 3500.0),
                idx("RTSI", "2024-01-02", 1100.0),
            ],
        )
        .unwrap();
        upsert_index_closes(&conn, &[idx("IMOEX", "2024-01-02", 3510.0)]).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM index_history", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            latest_index_close(&conn, "IMOEX").unwrap().unwrap().close,
            3510.0
        );
        assert_eq!(
            latest_index_close(&conn, "RTSI").unwrap().unwrap().close,
            1100.0
        );
    }

    #[test]
    fn currency_range_is_scoped_to_pair() {
        let conn = test_db();

        let rows = vec![
            CurrencyClose {
                pair: "USD/RUB".to_string(),
                trade_date: d("2024-01-03"),
                close: 90.12,
            },
            CurrencyClose {
                pair: "USD/RUB".to_string(),
                trade_date: d("2024-01-02"),
                close: 89.69,
            },
            CurrencyClose {
                pair: "EUR/RUB".to_string(),
                trade_date: d("2024-01-02"),
                close: 99.19,
            },
        ];
        upsert_currency_closes(&conn, &rows).unwrap();

        let usd = currency_range(&conn, "USD/RUB", d("2024-01-01"), d("2024-01-31")).unwrap();
        assert_eq!(usd.len(), 2);
        assert_eq!(usd[0].trade_date, d("2024-01-02"));
        assert_eq!(
            currency_pairs(&conn).unwrap(),
            vec!["EUR/RUB", "USD/RUB"]
        );
    }

    #[test]
    fn exchange_closes_keyed_per_operator() {
        let conn = test_db();

        let rows = vec![
            ExchangeClose {
                ticker: "ICE".to_string(),
                trade_date: d("2024-01-31"),
                close: 128.5,
            },
            ExchangeClose {
                ticker: "CME".to_string(),
                trade_date: d("2024-01-31"),
                close: 211.3,
            },
        ];
        upsert_exchange_closes(&conn, &rows).unwrap();

        assert_eq!(exchange_tickers(&conn).unwrap(), vec!["CME", "ICE"]);
        let ice = exchange_range(&conn, "ICE", d("2024-01-01"), d("2024-12-31")).unwrap();
        assert_eq!(ice, vec![ClosePoint { trade_date: d("2024-01-31"), close: 128.5 }]);
    }

    #[test]
    fn brent_upsert_is_idempotent() {
        let conn = test_db();
        let point = ClosePoint {
            trade_date: d("2024-01-02"),
            close: 78.3,
        };

        upsert_brent_closes(&conn, &[point.clone()]).unwrap();
        upsert_brent_closes(&conn, &[point.clone()]).unwrap();

        assert_eq!(
            brent_range(&conn, d("2024-01-01"), d("2024-01-31")).unwrap(),
            vec![point]
        );
    }

    #[test]
    fn trading_volumes_are_an_independent_series() {
        let conn = test_db();

        upsert_trading_volumes(
            &conn,
            &[VolumePoint {
                trade_date: d("2024-01-02"),
                value: 48_500_000_000.0,
            }],
        )
        .unwrap();

        // No stock bar for that date is required
        assert_eq!(
            latest_trading_volume(&conn).unwrap().unwrap().value,
            48_500_000_000.0
        );
    }

    #[test]
    fn key_rate_on_steps_between_changes() {
        // Seeded history: 20.00 from 2022-02-28, 17.00 from 2022-04-11
        let conn = test_db();

        assert_eq!(key_rate_on(&conn, d("2022-03-15")).unwrap(), Some(20.0));
        assert_eq!(key_rate_on(&conn, d("2022-04-11")).unwrap(), Some(17.0));
        assert_eq!(key_rate_on(&conn, d("2012-01-01")).unwrap(), None);
    }

    #[test]
    fn key_rates_seeded_and_extendable() {
        let conn = test_db();

        let seeded = key_rates(&conn).unwrap();
        assert_eq!(seeded.len(), 27);
        assert_eq!(seeded.last().unwrap().rate, 21.0);

        upsert_key_rates(
            &conn,
            &[KeyRate {
                effective_date: d("2025-06-09"),
                rate: 20.0,
            }],
        )
        .unwrap();
        assert_eq!(
            latest_key_rate(&conn).unwrap().unwrap().effective_date,
            d("2025-06-09")
        );
    }
}
