//! Row models for every series table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar of the MOEX stock
///
/// `close` is the one field a bar cannot be stored without; the remaining
/// components may be missing on thin trading days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBar {
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<i64>,
    pub value: Option<f64>,
}

/// Write payload for the live snapshot (row id = 1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub last_price: Option<f64>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub cap: Option<f64>,
    pub cap_trend: Option<f64>,
    pub vol_today: Option<i64>,
    pub val_today: Option<f64>,
    pub num_trades: Option<i64>,
    pub issue_size: Option<i64>,
    pub update_time: Option<String>,
}

/// Stored live snapshot as the dashboard reads it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub last_price: Option<f64>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub cap: Option<f64>,
    pub cap_trend: Option<f64>,
    pub vol_today: Option<i64>,
    pub val_today: Option<f64>,
    pub num_trades: Option<i64>,
    pub issue_size: Option<i64>,
    pub update_time: Option<String>,
    pub updated_at: String,
}

/// One dividend event, keyed by registry close date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub registry_close_date: NaiveDate,
    pub value: f64,
    pub currency: String,
}

/// Index close, one of several series multiplexed by ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexClose {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

/// Currency close, multiplexed by pair (e.g. "USD/RUB")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyClose {
    pub pair: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

/// Foreign exchange-operator close, multiplexed by ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeClose {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

/// Single (date, close) observation of a one-instrument series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub trade_date: NaiveDate,
    pub close: f64,
}

/// Market-wide trading value for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub trade_date: NaiveDate,
    pub value: f64,
}

/// Central-bank key rate; the value holds until superseded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRate {
    pub effective_date: NaiveDate,
    pub rate: f64,
}

/// One annual World Bank observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub country: String,
    pub indicator: String,
    pub year: i32,
    pub value: f64,
}

/// (year, value) point of an annual indicator series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualPoint {
    pub year: i32,
    pub value: f64,
}

/// Sync ledger entry: last date successfully ingested for a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub source: String,
    pub last_date: NaiveDate,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_bar_serializes_iso_dates() {
        let bar = StockBar {
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: Some(200.0),
            high: Some(205.5),
            low: Some(199.1),
            close: 203.2,
            volume: Some(1_250_000),
            value: Some(253_000_000.0),
        };

        let json = serde_json::to_value(&bar).unwrap();
        assert_eq!(json["trade_date"], "2024-01-02");
        assert_eq!(json["close"], 203.2);
    }

    #[test]
    fn live_quote_roundtrips_with_missing_fields() {
        let quote = LiveQuote {
            last_price: Some(210.5),
            ..Default::default()
        };

        let json = serde_json::to_string(&quote).unwrap();
        let back: LiveQuote = serde_json::from_str(&json).unwrap();
        assert_eq!(back, quote);
    }
}
