//! Persistent market-data store for the MOEX dashboard.
//!
//! Stores daily OHLCV history, a live snapshot, dividends, macro indicators
//! and cross-market reference series in SQLite, and keeps a per-source sync
//! ledger so the scheduled updater can resume incrementally. Writes go
//! through [`MarketDb`] (trusted updater, single writer); the dashboard
//! reads through [`ReadOnlyDb`], whose connections are opened read-only so
//! no write can reach the file from that side.

pub mod db;
pub mod error;

pub use db::models::{
    AnnualPoint, ClosePoint, CurrencyClose, Dividend, ExchangeClose, Indicator, IndexClose,
    KeyRate, LiveQuote, LiveSnapshot, StockBar, SyncEntry, VolumePoint,
};
pub use db::{sources, MarketDb, ReadOnlyDb};
pub use error::{Result, StoreError};
