//! Database migrations for all series tables

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Run each migration
    run_migration(conn, "001_stock_history", CREATE_STOCK_HISTORY_TABLE)?;
    run_migration(conn, "002_live_snapshot", CREATE_LIVE_SNAPSHOT_TABLE)?;
    run_migration(conn, "003_dividends", CREATE_DIVIDENDS_TABLE)?;
    run_migration(conn, "004_index_history", CREATE_INDEX_HISTORY_TABLE)?;
    run_migration(conn, "005_currency_history", CREATE_CURRENCY_HISTORY_TABLE)?;
    run_migration(conn, "006_brent_history", CREATE_BRENT_HISTORY_TABLE)?;
    run_migration(conn, "007_trading_volumes", CREATE_TRADING_VOLUMES_TABLE)?;
    run_migration(conn, "008_world_bank_indicators", CREATE_WORLD_BANK_TABLE)?;
    run_migration(conn, "009_global_exchanges", CREATE_GLOBAL_EXCHANGES_TABLE)?;
    run_migration(conn, "010_key_rates", CREATE_KEY_RATES_TABLE)?;
    run_migration(conn, "011_meta", CREATE_META_TABLE)?;
    run_migration(conn, "012_seed_key_rates", SEED_KEY_RATES)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_STOCK_HISTORY_TABLE: &str = r#"
CREATE TABLE stock_history (
    trade_date TEXT PRIMARY KEY,
    open REAL,
    high REAL,
    low REAL,
    close REAL NOT NULL,
    volume INTEGER,
    value REAL
);
"#;

const CREATE_LIVE_SNAPSHOT_TABLE: &str = r#"
CREATE TABLE live_snapshot (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_price REAL,
    open_price REAL,
    high_price REAL,
    low_price REAL,
    cap REAL,
    cap_trend REAL,
    vol_today INTEGER,
    val_today REAL,
    num_trades INTEGER,
    issue_size INTEGER,
    update_time TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_DIVIDENDS_TABLE: &str = r#"
CREATE TABLE dividends (
    registry_close_date TEXT PRIMARY KEY,
    value REAL NOT NULL,
    currency TEXT NOT NULL DEFAULT 'SUR'
);
"#;

const CREATE_INDEX_HISTORY_TABLE: &str = r#"
CREATE TABLE index_history (
    ticker TEXT NOT NULL,
    trade_date TEXT NOT NULL,
    close REAL NOT NULL,
    PRIMARY KEY (ticker, trade_date)
);
"#;

const CREATE_CURRENCY_HISTORY_TABLE: &str = r#"
CREATE TABLE currency_history (
    pair TEXT NOT NULL,
    trade_date TEXT NOT NULL,
    close REAL NOT NULL,
    PRIMARY KEY (pair, trade_date)
);
"#;

const CREATE_BRENT_HISTORY_TABLE: &str = r#"
CREATE TABLE brent_history (
    trade_date TEXT PRIMARY KEY,
    close REAL NOT NULL
);
"#;

const CREATE_TRADING_VOLUMES_TABLE: &str = r#"
CREATE TABLE trading_volumes (
    trade_date TEXT PRIMARY KEY,
    value REAL NOT NULL
);
"#;

const CREATE_WORLD_BANK_TABLE: &str = r#"
CREATE TABLE world_bank_indicators (
    country TEXT NOT NULL,
    indicator TEXT NOT NULL,
    year INTEGER NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (country, indicator, year)
);
"#;

const CREATE_GLOBAL_EXCHANGES_TABLE: &str = r#"
CREATE TABLE global_exchanges (
    ticker TEXT NOT NULL,
    trade_date TEXT NOT NULL,
    close REAL NOT NULL,
    PRIMARY KEY (ticker, trade_date)
);
"#;

const CREATE_KEY_RATES_TABLE: &str = r#"
CREATE TABLE key_rates (
    effective_date TEXT PRIMARY KEY,
    rate REAL NOT NULL
);
"#;

const CREATE_META_TABLE: &str = r#"
CREATE TABLE meta (
    source TEXT PRIMARY KEY,
    last_date TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// CBR key-rate history, maintained manually after the seed
const SEED_KEY_RATES: &str = r#"
INSERT OR IGNORE INTO key_rates (effective_date, rate) VALUES
    ('2013-09-13', 5.50), ('2014-03-03', 7.00), ('2014-04-28', 7.50),
    ('2014-10-31', 9.50), ('2014-12-12', 10.50), ('2014-12-16', 17.00),
    ('2015-02-02', 15.00), ('2015-08-03', 11.00), ('2016-06-14', 10.50),
    ('2017-03-27', 9.75), ('2017-12-18', 7.75), ('2018-09-17', 7.50),
    ('2019-06-17', 7.50), ('2019-12-16', 6.25), ('2020-04-27', 5.50),
    ('2020-07-27', 4.25), ('2021-03-22', 4.50), ('2021-07-26', 6.50),
    ('2021-12-20', 8.50), ('2022-02-28', 20.00), ('2022-04-11', 17.00),
    ('2022-09-19', 7.50), ('2023-07-24', 8.50), ('2023-10-30', 15.00),
    ('2023-12-18', 16.00), ('2024-07-26', 18.00), ('2024-10-25', 21.00);
INSERT OR IGNORE INTO meta (source, last_date) VALUES ('key_rates', '2024-10-25');
"#;
