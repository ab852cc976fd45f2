//! Dividend events, keyed by registry close date

use crate::db::models::Dividend;
use crate::error::Result;
use rusqlite::{params, Connection};

/// Upsert dividend events; one event per registry close date
pub fn upsert_dividends(conn: &Connection, dividends: &[Dividend]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO dividends (registry_close_date, value, currency)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (registry_close_date) DO UPDATE SET
           value = excluded.value, currency = excluded.currency",
    )?;

    for dividend in dividends {
        super::require_positive("value", dividend.value)?;
        stmt.execute(params![
            dividend.registry_close_date,
            dividend.value,
            dividend.currency,
        ])?;
    }

    Ok(dividends.len())
}

/// All dividend events, ordered by registry close date ascending
pub fn list(conn: &Connection) -> Result<Vec<Dividend>> {
    let mut stmt = conn.prepare(
        "SELECT registry_close_date, value, currency
         FROM dividends ORDER BY registry_close_date ASC",
    )?;

    let dividends = stmt
        .query_map([], |row| {
            Ok(Dividend {
                registry_close_date: row.get(0)?,
                value: row.get(1)?,
                currency: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(dividends)
}

/// Most recent dividend event
pub fn latest(conn: &Connection) -> Result<Option<Dividend>> {
    let result = conn.query_row(
        "SELECT registry_close_date, value, currency
         FROM dividends ORDER BY registry_close_date DESC LIMIT 1",
        [],
        |row| {
            Ok(Dividend {
                registry_close_date: row.get(0)?,
                value: row.get(1)?,
                currency: row.get(2)?,
            })
        },
    );

    match result {
        Ok(dividend) => Ok(Some(dividend)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use chrono::NaiveDate;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn div(date: &str, value: f64) -> Dividend {
        Dividend {
            registry_close_date: date.parse().unwrap(),
            value,
            currency: "SUR".to_string(),
        }
    }

    #[test]
    fn upsert_replaces_value_for_same_close_date() {
        let conn = test_db();

        upsert_dividends(&conn, &[div("2024-05-14", 17.35)]).unwrap();
        upsert_dividends(&conn, &[div("2024-05-14", 17.40)]).unwrap();

        let all = list(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, 17.40);
    }

    #[test]
    fn list_is_ordered_and_latest_is_max_date() {
        let conn = test_db();

        upsert_dividends(&conn, &[div("2024-05-14", 17.35), div("2023-05-12", 9.65)]).unwrap();

        let all = list(&conn).unwrap();
        assert_eq!(
            all[0].registry_close_date,
            "2023-05-12".parse::<NaiveDate>().unwrap()
        );
        assert_eq!(
            latest(&conn).unwrap().unwrap().registry_close_date,
            "2024-05-14".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn null_value_rejected_by_schema() {
        let conn = test_db();

        let err = conn.execute(
            "INSERT INTO dividends (registry_close_date, value) VALUES ('2024-05-14', NULL)",
            [],
        );
        assert!(err.is_err());
    }
}
