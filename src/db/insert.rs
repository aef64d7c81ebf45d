use rusqlite::Connection;
use serde::Serialize;

use crate::parser::types::Dataset;

/// Stored timestamp format, sortable as text.
pub const DB_DT_FMT: &str = "%Y-%m-%dT%H:%M:%S";

/// Import metadata written alongside a snapshot.
#[derive(Debug, Clone)]
pub struct NewImport {
    pub source: String,
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub unparsed_dates: usize,
    pub missing_columns: Vec<String>,
}

fn json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, rusqlite::Error> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Replaces the whole ticket snapshot in one transaction and returns the new
/// import id. Previous imports stay in the history, without their tickets.
pub fn replace_snapshot(
    conn: &mut Connection,
    import: &NewImport,
    dataset: &Dataset,
) -> Result<i64, rusqlite::Error> {
    let created: Vec<_> = dataset.tickets.iter().filter_map(|t| t.created_at).collect();
    let date_from = created.iter().min().map(|d| d.format(DB_DT_FMT).to_string());
    let date_to = created.iter().max().map(|d| d.format(DB_DT_FMT).to_string());
    let present: Vec<&str> = dataset.fields.iter().map(|f| f.column()).collect();

    let tx = conn.transaction()?;

    tx.execute("DELETE FROM tickets", [])?;
    tx.execute("UPDATE imports SET is_active = 0 WHERE is_active = 1", [])?;
    tx.execute(
        "INSERT INTO imports (
            source, total_rows, parsed_rows, skipped_rows, unparsed_dates,
            present_fields, missing_columns, extra_columns,
            date_range_from, date_range_to, is_active
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
        rusqlite::params![
            import.source,
            import.total_rows as i64,
            dataset.tickets.len() as i64,
            import.skipped_rows as i64,
            import.unparsed_dates as i64,
            json_text(&present)?,
            json_text(&import.missing_columns)?,
            json_text(&dataset.extra_columns)?,
            date_from,
            date_to,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO tickets (
                import_id, row_num, service, tags, company, created_at, finish_at, extra
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for (row_num, t) in dataset.tickets.iter().enumerate() {
            stmt.execute(rusqlite::params![
                import_id,
                row_num as i64,
                t.service,
                t.tags,
                t.company,
                t.created_at.map(|d| d.format(DB_DT_FMT).to_string()),
                t.finish_at.map(|d| d.format(DB_DT_FMT).to_string()),
                json_text(&t.extra)?,
            ])?;
        }
    }

    tx.commit()?;
    log::info!(
        "Snapshot {} replaced: {} tickets from {}",
        import_id,
        dataset.tickets.len(),
        import.source
    );
    Ok(import_id)
}
