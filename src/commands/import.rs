use serde::Serialize;
use std::time::Instant;

use crate::config::get_config_from_db;
use crate::db::insert::{replace_snapshot, NewImport};
use crate::error::AppError;
use crate::parser::types::ParseWarning;
use crate::source::{self, DataSource};
use crate::state::{AppState, DbAccess};

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum ImportEvent {
    #[serde(rename_all = "camelCase")]
    Progress { rows_parsed: usize, phase: String },
    #[serde(rename_all = "camelCase")]
    Complete {
        duration_ms: u64,
        total_tickets: usize,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub import_id: i64,
    pub source: String,
    pub total_tickets: usize,
    pub skipped_rows: usize,
    pub unparsed_created_dates: usize,
    pub warnings: Vec<ParseWarning>,
    pub detected_columns: Vec<String>,
    pub missing_optional_columns: Vec<String>,
    pub unique_services: Vec<String>,
    pub parse_duration_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: i64,
    pub source: String,
    pub import_date: String,
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub skipped_rows: usize,
    pub missing_columns: Vec<String>,
    pub date_range_from: Option<String>,
    pub date_range_to: Option<String>,
    pub is_active: bool,
}

/// Picks the explicit source, else the configured `source_url`.
pub fn resolve_source(
    state: &AppState,
    explicit: Option<DataSource>,
) -> Result<DataSource, AppError> {
    if let Some(source) = explicit {
        return Ok(source);
    }
    let config = state.db(|conn| Ok(get_config_from_db(conn)?))?;
    config.source_url.map(DataSource::Url).ok_or_else(|| {
        AppError::Custom(
            "no source: pass a file path or URL, use --sheet, or set source_url".into(),
        )
    })
}

/// Manual refresh: reads the whole sheet and replaces the stored snapshot.
pub fn refresh(
    state: &AppState,
    source: &DataSource,
    on_progress: impl Fn(ImportEvent),
) -> Result<RefreshResult, AppError> {
    let start = Instant::now();

    let parse_output = source::load(source, |rows_parsed, _accepted| {
        on_progress(ImportEvent::Progress {
            rows_parsed,
            phase: "Parsing".to_string(),
        });
    })?;

    let import = NewImport {
        source: source.describe().to_string(),
        total_rows: parse_output.total_rows_processed,
        skipped_rows: parse_output.skipped_rows,
        unparsed_dates: parse_output.unparsed_created_dates,
        missing_columns: parse_output.missing_optional_columns.clone(),
    };
    let total_tickets = parse_output.dataset.tickets.len();

    let import_id =
        state.db_mut(|conn| Ok(replace_snapshot(conn, &import, &parse_output.dataset)?))?;

    for warning in &parse_output.warnings {
        log::warn!("Line {}: {}", warning.line, warning.message);
    }

    on_progress(ImportEvent::Complete {
        duration_ms: start.elapsed().as_millis() as u64,
        total_tickets,
    });

    Ok(RefreshResult {
        import_id,
        source: import.source,
        total_tickets,
        skipped_rows: parse_output.skipped_rows,
        unparsed_created_dates: parse_output.unparsed_created_dates,
        warnings: parse_output.warnings,
        detected_columns: parse_output.detected_columns,
        missing_optional_columns: parse_output.missing_optional_columns,
        unique_services: parse_output.unique_services,
        parse_duration_ms: parse_output.parse_duration_ms,
    })
}

pub fn get_import_history(state: &AppState) -> Result<Vec<ImportRecord>, AppError> {
    state.db(|conn| Ok(crate::db::queries::get_import_history(conn)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup::init_memory_db;
    use clap::Parser;
    use std::cell::RefCell;
    use std::io::Write;

    fn write_fixture(name: &str, content: &str) -> String {
        let path = std::env::temp_dir().join(format!(
            "ticket_dashboard_{}_{}.csv",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_refresh_from_file_replaces_snapshot() {
        let state = AppState::new(init_memory_db().unwrap());
        let path = write_fixture(
            "refresh",
            "Services,Tags,Company,Created Date,Finish Date\n\
             Issue,bug,Acme,05/01/2024,\n\
             Task,ops,Beta,xx,\n",
        );
        let events = RefCell::new(Vec::new());
        let result = refresh(&state, &DataSource::File(path.clone()), |e| {
            events.borrow_mut().push(e)
        })
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(result.total_tickets, 2);
        assert_eq!(result.unparsed_created_dates, 1);
        assert!(result.missing_optional_columns.is_empty());
        assert!(matches!(
            events.borrow().last(),
            Some(ImportEvent::Complete { total_tickets: 2, .. })
        ));

        let history = get_import_history(&state).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, result.import_id);
    }

    #[test]
    fn test_resolve_source_needs_config_or_explicit() {
        let state = AppState::new(init_memory_db().unwrap());
        let message = resolve_source(&state, None).unwrap_err().to_string();
        // The hint only names arguments the refresh command accepts
        assert!(message.contains("--sheet"));
        assert!(!message.contains("--url"));
        crate::cli::Cli::try_parse_from(["ticket-dashboard", "refresh", "--sheet", "abc"])
            .unwrap();

        state
            .db(|conn| {
                crate::config::set_config_value(conn, "source_url", "https://example.org/x.csv")
            })
            .unwrap();
        assert_eq!(
            resolve_source(&state, None).unwrap(),
            DataSource::Url("https://example.org/x.csv".into())
        );
        assert_eq!(
            resolve_source(&state, Some(DataSource::File("a.csv".into()))).unwrap(),
            DataSource::File("a.csv".into())
        );
    }
}
