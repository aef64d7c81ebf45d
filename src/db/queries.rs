use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;

use crate::analyzer::selection::SelectionState;
use crate::commands::import::ImportRecord;
use crate::db::insert::DB_DT_FMT;
use crate::parser::types::{Dataset, Field, Ticket};

// ─── Private helpers ────────────────────────────────────────────────────────

fn parse_db_datetime(s: Option<String>) -> Option<NaiveDateTime> {
    s.and_then(|v| NaiveDateTime::parse_from_str(&v, DB_DT_FMT).ok())
}

/// An unreadable JSON column is a conversion error, never an empty list.
fn json_column<T: DeserializeOwned>(idx: usize, s: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(s).map_err(|e| {
        log::warn!("Unreadable JSON column {}: {}", idx, e);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

pub fn get_active_import_id(conn: &Connection) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT id FROM imports WHERE is_active = 1 ORDER BY id DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
    .optional()
}

/// Rebuilds the dataset of the active import, rows in source order.
/// None when nothing was ever refreshed.
pub fn load_active_dataset(conn: &Connection) -> Result<Option<Dataset>, rusqlite::Error> {
    let Some(import_id) = get_active_import_id(conn)? else {
        return Ok(None);
    };

    let (present, extra_columns): (String, String) = conn.query_row(
        "SELECT present_fields, extra_columns FROM imports WHERE id = ?1",
        [import_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare_cached(
        "SELECT service, tags, company, created_at, finish_at, extra
         FROM tickets WHERE import_id = ?1 ORDER BY row_num",
    )?;
    let tickets = stmt
        .query_map([import_id], |row| {
            let extra: String = row.get(5)?;
            Ok(Ticket {
                service: row.get(0)?,
                tags: row.get(1)?,
                company: row.get(2)?,
                created_at: parse_db_datetime(row.get(3)?),
                finish_at: parse_db_datetime(row.get(4)?),
                extra: json_column(5, &extra)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Dataset {
        tickets,
        fields: json_column::<Vec<String>>(0, &present)?
            .iter()
            .filter_map(|name| Field::from_column(name))
            .collect(),
        extra_columns: json_column(1, &extra_columns)?,
    }))
}

pub fn get_import_history(conn: &Connection) -> Result<Vec<ImportRecord>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, source, import_date, total_rows, parsed_rows, skipped_rows,
                missing_columns, date_range_from, date_range_to, is_active
         FROM imports ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let missing: String = row.get(6)?;
            Ok(ImportRecord {
                id: row.get(0)?,
                source: row.get(1)?,
                import_date: row.get(2)?,
                total_rows: row.get::<_, i64>(3)? as usize,
                parsed_rows: row.get::<_, i64>(4)? as usize,
                skipped_rows: row.get::<_, i64>(5)? as usize,
                missing_columns: json_column(6, &missing)?,
                date_range_from: row.get(7)?,
                date_range_to: row.get(8)?,
                is_active: row.get::<_, i64>(9)? == 1,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ─── Selection store ─────────────────────────────────────────────────────────

pub fn load_selection(conn: &Connection) -> Result<SelectionState, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT key, value FROM selection_state")?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SelectionState::from_pairs(pairs))
}

/// Writes the store back as a whole; keys absent from `state` are dropped.
pub fn save_selection(
    conn: &mut Connection,
    state: &SelectionState,
) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM selection_state", [])?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO selection_state (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))",
        )?;
        for (key, value) in state.iter() {
            stmt.execute(rusqlite::params![key, value])?;
        }
    }
    tx.commit()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::selection::{SELECTED_COMPANY, SELECTED_TAG};
    use crate::db::insert::{replace_snapshot, NewImport};
    use crate::db::setup::init_memory_db;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn dataset(n: usize) -> Dataset {
        let tickets = (0..n)
            .map(|i| Ticket {
                service: Some(if i % 2 == 0 { "Issue" } else { "Task" }.to_string()),
                tags: if i == 0 { None } else { Some(format!("tag{}", i)) },
                company: Some("Acme".to_string()),
                created_at: if i == 1 { None } else { Some(dt("2024-01-05 10:30:00")) },
                finish_at: None,
                extra: vec![("No".to_string(), i.to_string())],
            })
            .collect();
        Dataset {
            tickets,
            fields: vec![Field::Services, Field::Tags, Field::Company, Field::CreatedDate],
            extra_columns: vec!["No".to_string()],
        }
    }

    fn import(source: &str) -> NewImport {
        NewImport {
            source: source.to_string(),
            total_rows: 3,
            skipped_rows: 0,
            unparsed_dates: 1,
            missing_columns: vec!["Finish Date".to_string()],
        }
    }

    #[test]
    fn test_no_snapshot() {
        let conn = init_memory_db().unwrap();
        assert!(get_active_import_id(&conn).unwrap().is_none());
        assert!(load_active_dataset(&conn).unwrap().is_none());
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_rows() {
        let mut conn = init_memory_db().unwrap();
        let original = dataset(3);
        replace_snapshot(&mut conn, &import("a.csv"), &original).unwrap();

        let loaded = load_active_dataset(&conn).unwrap().unwrap();
        assert_eq!(loaded.tickets, original.tickets);
        assert_eq!(loaded.fields, original.fields);
        assert_eq!(loaded.extra_columns, vec!["No"]);
    }

    #[test]
    fn test_refresh_is_full_replace() {
        let mut conn = init_memory_db().unwrap();
        replace_snapshot(&mut conn, &import("a.csv"), &dataset(5)).unwrap();
        let second = replace_snapshot(&mut conn, &import("b.csv"), &dataset(2)).unwrap();

        assert_eq!(get_active_import_id(&conn).unwrap(), Some(second));
        assert_eq!(load_active_dataset(&conn).unwrap().unwrap().tickets.len(), 2);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_import_history_ordered_desc() {
        let mut conn = init_memory_db().unwrap();
        replace_snapshot(&mut conn, &import("a.csv"), &dataset(3)).unwrap();
        replace_snapshot(&mut conn, &import("b.csv"), &dataset(3)).unwrap();

        let history = get_import_history(&conn).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, "b.csv");
        assert!(history[0].is_active);
        assert!(!history[1].is_active);
        assert_eq!(history[0].missing_columns, vec!["Finish Date"]);
        assert_eq!(history[0].date_range_from.as_deref(), Some("2024-01-05T10:30:00"));
    }

    #[test]
    fn test_corrupt_json_columns_fail_the_load() {
        let mut conn = init_memory_db().unwrap();
        replace_snapshot(&mut conn, &import("a.csv"), &dataset(3)).unwrap();

        conn.execute("UPDATE tickets SET extra = 'not json' WHERE row_num = 1", [])
            .unwrap();
        let err = load_active_dataset(&conn).unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(5, Type::Text, _)));

        conn.execute("UPDATE tickets SET extra = '[]'", []).unwrap();
        conn.execute("UPDATE imports SET present_fields = '{broken'", [])
            .unwrap();
        let err = load_active_dataset(&conn).unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _)));

        conn.execute("UPDATE imports SET missing_columns = ''", []).unwrap();
        assert!(get_import_history(&conn).is_err());
    }

    #[test]
    fn test_selection_store_roundtrip() {
        let mut conn = init_memory_db().unwrap();
        assert_eq!(load_selection(&conn).unwrap(), SelectionState::new());

        let mut state = SelectionState::new();
        state.pick(SELECTED_TAG, "bug");
        state.pick(SELECTED_COMPANY, "Acme");
        save_selection(&mut conn, &state).unwrap();
        assert_eq!(load_selection(&conn).unwrap(), state);

        state.clear();
        save_selection(&mut conn, &state).unwrap();
        assert_eq!(load_selection(&conn).unwrap(), SelectionState::new());
    }
}
