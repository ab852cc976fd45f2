//! Annual World Bank indicators
//!
//! Sparse macro data keyed by (country, indicator, year). Years with no
//! published value are simply absent.

use crate::db::models::{AnnualPoint, Indicator};
use crate::error::Result;
use rusqlite::{params, Connection};

/// Upsert annual observations keyed by (country, indicator, year)
pub fn upsert_indicators(conn: &Connection, rows: &[Indicator]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO world_bank_indicators (country, indicator, year, value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (country, indicator, year) DO UPDATE SET value = excluded.value",
    )?;

    for row in rows {
        stmt.execute(params![row.country, row.indicator, row.year, row.value])?;
    }

    Ok(rows.len())
}

/// Full series of one indicator for one country, year ascending
pub fn indicator_series(
    conn: &Connection,
    country: &str,
    indicator: &str,
) -> Result<Vec<AnnualPoint>> {
    let mut stmt = conn.prepare(
        "SELECT year, value FROM world_bank_indicators
         WHERE country = ?1 AND indicator = ?2
         ORDER BY year ASC",
    )?;

    let points = stmt
        .query_map(params![country, indicator], |row| {
            Ok(AnnualPoint {
                year: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(points)
}

/// Most recent observation of one indicator for one country
pub fn latest_indicator(
    conn: &Connection,
    country: &str,
    indicator: &str,
) -> Result<Option<AnnualPoint>> {
    let result = conn.query_row(
        "SELECT year, value FROM world_bank_indicators
         WHERE country = ?1 AND indicator = ?2
         ORDER BY year DESC LIMIT 1",
        params![country, indicator],
        |row| {
            Ok(AnnualPoint {
                year: row.get(0)?,
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

/// Indicator codes stored for a country
pub fn indicator_codes(conn: &Connection, country: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT indicator FROM world_bank_indicators
         WHERE country = ?1 ORDER BY indicator",
    )?;

    let codes = stmt
        .query_map(params![country], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(codes)
}
