//! Time-series store: SQLite-backed series tables plus the sync ledger
//!
//! Two handles exist. [`MarketDb`] is for the trusted updater: a single
//! writer connection behind a mutex, batch upserts running in transactions,
//! and the ledger advancing only after the batch commits. [`ReadOnlyDb`] is
//! for the anonymous dashboard: a pool of connections opened with
//! `SQLITE_OPEN_READ_ONLY`, so SELECT is the only capability that exists on
//! that side.

pub mod models;
pub mod sources;
mod connection;
mod dividends;
mod indicators;
mod meta;
mod migrations;
mod reference;
mod snapshot;
mod stock;

use crate::error::{Result, StoreError};
use chrono::NaiveDate;
use models::*;
use parking_lot::Mutex;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;

/// Required numeric columns must carry a real positive value; a zero or
/// non-finite close would read back as a valid settlement price.
pub(crate) fn require_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(StoreError::Validation(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Read-write handle for the trusted updater (single writer)
pub struct MarketDb {
    conn: Mutex<Connection>,
}

impl MarketDb {
    /// Open (or create) the database file and bring the schema up to date
    pub fn new(path: &Path) -> Result<Self> {
        let conn = connection::create_connection(path)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Sync ledger ==========

    /// Record the last successfully ingested date for a source.
    ///
    /// Call only after the corresponding series rows have committed; a batch
    /// that also writes rows should prefer [`MarketDb::sync_batch`], which
    /// makes that ordering impossible to get wrong.
    pub fn advance_sync(&self, source: &str, last_date: NaiveDate) -> Result<()> {
        let conn = self.conn.lock();
        meta::advance(&conn, source, last_date)?;
        tracing::debug!("Ledger advanced: {} -> {}", source, last_date);
        Ok(())
    }

    /// Run a write batch and advance the ledger atomically.
    ///
    /// The closure writes series rows against the supplied connection; the
    /// ledger row for `source` is updated in the same transaction. Any error
    /// rolls the whole batch back, so the ledger never points past data that
    /// failed to commit and a crashed batch costs a re-fetch, never a gap.
    pub fn sync_batch<T, F>(&self, source: &str, last_date: NaiveDate, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let out = f(&tx)?;
        meta::advance(&tx, source, last_date)?;
        tx.commit()?;

        tracing::info!("Synced {} through {}", source, last_date);
        Ok(out)
    }

    /// Last ingested date for a source
    pub fn last_synced(&self, source: &str) -> Result<Option<NaiveDate>> {
        let conn = self.conn.lock();
        meta::last_date(&conn, source)
    }

    /// All ledger entries
    pub fn sync_entries(&self) -> Result<Vec<SyncEntry>> {
        let conn = self.conn.lock();
        meta::entries(&conn)
    }

    // ========== Stock history ==========

    /// Upsert daily bars in one transaction
    pub fn upsert_stock_bars(&self, bars: &[StockBar]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = stock::upsert_bars(&tx, bars)?;
        tx.commit()?;

        tracing::debug!("Upserted {} stock bars", count);
        Ok(count)
    }

    /// Bars in [from, to], trade date ascending
    pub fn stock_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<StockBar>> {
        let conn = self.conn.lock();
        stock::range(&conn, from, to)
    }

    /// Most recent bar
    pub fn latest_bar(&self) -> Result<Option<StockBar>> {
        let conn = self.conn.lock();
        stock::latest(&conn)
    }

    // ========== Live snapshot ==========

    /// Overwrite the singleton snapshot row
    pub fn replace_snapshot(&self, quote: &LiveQuote) -> Result<()> {
        let conn = self.conn.lock();
        snapshot::replace(&conn, quote)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Result<Option<LiveSnapshot>> {
        let conn = self.conn.lock();
        snapshot::get(&conn)
    }

    // ========== Dividends ==========

    /// Upsert dividend events in one transaction
    pub fn upsert_dividends(&self, rows: &[Dividend]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = dividends::upsert_dividends(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// All dividend events, date ascending
    pub fn dividends(&self) -> Result<Vec<Dividend>> {
        let conn = self.conn.lock();
        dividends::list(&conn)
    }

    /// Most recent dividend event
    pub fn latest_dividend(&self) -> Result<Option<Dividend>> {
        let conn = self.conn.lock();
        dividends::latest(&conn)
    }

    // ========== Reference series ==========

    /// Upsert index closes in one transaction
    pub fn upsert_index_closes(&self, rows: &[IndexClose]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = reference::upsert_index_closes(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// Closes of one index in [from, to]
    pub fn index_range(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosePoint>> {
        let conn = self.conn.lock();
        reference::index_range(&conn, ticker, from, to)
    }

    /// Most recent close of one index
    pub fn latest_index_close(&self, ticker: &str) -> Result<Option<ClosePoint>> {
        let conn = self.conn.lock();
        reference::latest_index_close(&conn, ticker)
    }

    /// Tickers present in the index table
    pub fn index_tickers(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        reference::index_tickers(&conn)
    }

    /// Upsert currency closes in one transaction
    pub fn upsert_currency_closes(&self, rows: &[CurrencyClose]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = reference::upsert_currency_closes(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// Closes of one pair in [from, to]
    pub fn currency_range(
        &self,
        pair: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosePoint>> {
        let conn = self.conn.lock();
        reference::currency_range(&conn, pair, from, to)
    }

    /// Most recent close of one pair
    pub fn latest_currency_close(&self, pair: &str) -> Result<Option<ClosePoint>> {
        let conn = self.conn.lock();
        reference::latest_currency_close(&conn, pair)
    }

    /// Pairs present in the currency table
    pub fn currency_pairs(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        reference::currency_pairs(&conn)
    }

    /// Upsert foreign exchange-operator closes in one transaction
    pub fn upsert_exchange_closes(&self, rows: &[ExchangeClose]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = reference::upsert_exchange_closes(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// Closes of one exchange operator in [from, to]
    pub fn exchange_range(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosePoint>> {
        let conn = self.conn.lock();
        reference::exchange_range(&conn, ticker, from, to)
    }

    /// Most recent close of one exchange operator
    pub fn latest_exchange_close(&self, ticker: &str) -> Result<Option<ClosePoint>> {
        let conn = self.conn.lock();
        reference::latest_exchange_close(&conn, ticker)
    }

    /// Tickers present in the global exchanges table
    pub fn exchange_tickers(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        reference::exchange_tickers(&conn)
    }

    /// Upsert Brent closes in one transaction
    pub fn upsert_brent_closes(&self, rows: &[ClosePoint]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = reference::upsert_brent_closes(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// Brent closes in [from, to]
    pub fn brent_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClosePoint>> {
        let conn = self.conn.lock();
        reference::brent_range(&conn, from, to)
    }

    /// Most recent Brent close
    pub fn latest_brent_close(&self) -> Result<Option<ClosePoint>> {
        let conn = self.conn.lock();
        reference::latest_brent_close(&conn)
    }

    /// Upsert market-wide trading values in one transaction
    pub fn upsert_trading_volumes(&self, rows: &[VolumePoint]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = reference::upsert_trading_volumes(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// Trading values in [from, to]
    pub fn trading_volume_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<VolumePoint>> {
        let conn = self.conn.lock();
        reference::trading_volume_range(&conn, from, to)
    }

    /// Most recent market-wide trading value
    pub fn latest_trading_volume(&self) -> Result<Option<VolumePoint>> {
        let conn = self.conn.lock();
        reference::latest_trading_volume(&conn)
    }

    /// Upsert key-rate changes in one transaction
    pub fn upsert_key_rates(&self, rows: &[KeyRate]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = reference::upsert_key_rates(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// All key-rate changes, effective date ascending
    pub fn key_rates(&self) -> Result<Vec<KeyRate>> {
        let conn = self.conn.lock();
        reference::key_rates(&conn)
    }

    /// Rate in effect on a date
    pub fn key_rate_on(&self, date: NaiveDate) -> Result<Option<f64>> {
        let conn = self.conn.lock();
        reference::key_rate_on(&conn, date)
    }

    /// Most recent key-rate change
    pub fn latest_key_rate(&self) -> Result<Option<KeyRate>> {
        let conn = self.conn.lock();
        reference::latest_key_rate(&conn)
    }

    // ========== World Bank indicators ==========

    /// Upsert annual observations in one transaction
    pub fn upsert_indicators(&self, rows: &[Indicator]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let count = indicators::upsert_indicators(&tx, rows)?;
        tx.commit()?;
        Ok(count)
    }

    /// Full indicator series for one country, year ascending
    pub fn indicator_series(&self, country: &str, indicator: &str) -> Result<Vec<AnnualPoint>> {
        let conn = self.conn.lock();
        indicators::indicator_series(&conn, country, indicator)
    }

    /// Most recent observation of one indicator
    pub fn latest_indicator(&self, country: &str, indicator: &str) -> Result<Option<AnnualPoint>> {
        let conn = self.conn.lock();
        indicators::latest_indicator(&conn, country, indicator)
    }

    /// Indicator codes stored for a country
    pub fn indicator_codes(&self, country: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        indicators::indicator_codes(&conn, country)
    }
}

/// SELECT-only handle for anonymous dashboard readers.
///
/// Connections come from a pool and are opened with `SQLITE_OPEN_READ_ONLY`,
/// so even a hand-written statement cannot modify the file. The type itself
/// exposes no write methods.
pub struct ReadOnlyDb {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl ReadOnlyDb {
    /// Open a pool of read-only connections to an existing database file
    pub fn open(path: &Path) -> Result<Self> {
        // Probe once outside the pool so a missing file surfaces as a
        // database error instead of a pool timeout
        connection::open_read_only(path)?;

        let manager =
            SqliteConnectionManager::file(path).with_flags(connection::read_only_flags());
        let pool = r2d2::Pool::builder().build(manager)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Bars in [from, to], trade date ascending
    pub fn stock_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<StockBar>> {
        stock::range(&*self.conn()?, from, to)
    }

    /// Most recent bar
    pub fn latest_bar(&self) -> Result<Option<StockBar>> {
        stock::latest(&*self.conn()?)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Result<Option<LiveSnapshot>> {
        snapshot::get(&*self.conn()?)
    }

    /// All dividend events, date ascending
    pub fn dividends(&self) -> Result<Vec<Dividend>> {
        dividends::list(&*self.conn()?)
    }

    /// Most recent dividend event
    pub fn latest_dividend(&self) -> Result<Option<Dividend>> {
        dividends::latest(&*self.conn()?)
    }

    /// Closes of one index in [from, to]
    pub fn index_range(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosePoint>> {
        reference::index_range(&*self.conn()?, ticker, from, to)
    }

    /// Most recent close of one index
    pub fn latest_index_close(&self, ticker: &str) -> Result<Option<ClosePoint>> {
        reference::latest_index_close(&*self.conn()?, ticker)
    }

    /// Tickers present in the index table
    pub fn index_tickers(&self) -> Result<Vec<String>> {
        reference::index_tickers(&*self.conn()?)
    }

    /// Closes of one pair in [from, to]
    pub fn currency_range(
        &self,
        pair: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosePoint>> {
        reference::currency_range(&*self.conn()?, pair, from, to)
    }

    /// Most recent close of one pair
    pub fn latest_currency_close(&self, pair: &str) -> Result<Option<ClosePoint>> {
        reference::latest_currency_close(&*self.conn()?, pair)
    }

    /// Pairs present in the currency table
    pub fn currency_pairs(&self) -> Result<Vec<String>> {
        reference::currency_pairs(&*self.conn()?)
    }

    /// Closes of one exchange operator in [from, to]
    pub fn exchange_range(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ClosePoint>> {
        reference::exchange_range(&*self.conn()?, ticker, from, to)
    }

    /// Most recent close of one exchange operator
    pub fn latest_exchange_close(&self, ticker: &str) -> Result<Option<ClosePoint>> {
        reference::latest_exchange_close(&*self.conn()?, ticker)
    }

    /// Tickers present in the global exchanges table
    pub fn exchange_tickers(&self) -> Result<Vec<String>> {
        reference::exchange_tickers(&*self.conn()?)
    }

    /// Brent closes in [from, to]
    pub fn brent_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClosePoint>> {
        reference::brent_range(&*self.conn()?, from, to)
    }

    /// Most recent Brent close
    pub fn latest_brent_close(&self) -> Result<Option<ClosePoint>> {
        reference::latest_brent_close(&*self.conn()?)
    }

    /// Trading values in [from, to]
    pub fn trading_volume_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<VolumePoint>> {
        reference::trading_volume_range(&*self.conn()?, from, to)
    }

    /// Most recent market-wide trading value
    pub fn latest_trading_volume(&self) -> Result<Option<VolumePoint>> {
        reference::latest_trading_volume(&*self.conn()?)
    }

    /// All key-rate changes, effective date ascending
    pub fn key_rates(&self) -> Result<Vec<KeyRate>> {
        reference::key_rates(&*self.conn()?)
    }

    /// Rate in effect on a date
    pub fn key_rate_on(&self, date: NaiveDate) -> Result<Option<f64>> {
        reference::key_rate_on(&*self.conn()?, date)
    }

    /// Most recent key-rate change
    pub fn latest_key_rate(&self) -> Result<Option<KeyRate>> {
        reference::latest_key_rate(&*self.conn()?)
    }

    /// Full indicator series for one country, year ascending
    pub fn indicator_series(&self, country: &str, indicator: &str) -> Result<Vec<AnnualPoint>> {
        indicators::indicator_series(&*self.conn()?, country, indicator)
    }

    /// Most recent observation of one indicator
    pub fn latest_indicator(&self, country: &str, indicator: &str) -> Result<Option<AnnualPoint>> {
        indicators::latest_indicator(&*self.conn()?, country, indicator)
    }

    /// Indicator codes stored for a country
    pub fn indicator_codes(&self, country: &str) -> Result<Vec<String>> {
        indicators::indicator_codes(&*self.conn()?, country)
    }

    /// Last ingested date for a source (ledger is publicly readable)
    pub fn last_synced(&self, source: &str) -> Result<Option<NaiveDate>> {
        meta::last_date(&*self.conn()?, source)
    }

    /// All ledger entries
    pub fn sync_entries(&self) -> Result<Vec<SyncEntry>> {
        meta::entries(&*self.conn()?)
    }
}
