pub mod analyzer;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod parser;
pub mod render;
pub mod source;
pub mod state;

use analyzer::temporal::FilterMode;
use cli::{Cli, Commands, ConfigAction, SelectionAction};
use commands::dashboard::DashboardQuery;
use commands::import::ImportEvent;
use error::AppError;
use state::{AppState, DbAccess};

/// Runs one CLI invocation against the database named by `--db`.
pub fn run(cli: Cli) -> Result<(), AppError> {
    let conn = db::setup::init_db(&cli.db)?;
    let state = AppState::new(conn);

    match cli.command {
        Commands::Refresh(args) => {
            let source = commands::import::resolve_source(&state, args.data_source())?;
            let result = commands::import::refresh(&state, &source, |event| match event {
                ImportEvent::Progress { rows_parsed, phase } => {
                    log::debug!("{}: {} rows", phase, rows_parsed)
                }
                ImportEvent::Complete {
                    duration_ms,
                    total_tickets,
                } => log::info!("Import done: {} tickets in {} ms", total_tickets, duration_ms),
            })?;
            print!("{}", render::render_refresh(&result));
        }
        Commands::Dashboard(args) => {
            let mut mode = args.filter_mode();
            // --year without --months: every month holding data that year
            if let Some(FilterMode::Yearly { year, months }) = &mut mode {
                if months.is_empty() {
                    let offerings = commands::dashboard::get_offerings(&state)?;
                    *months = offerings
                        .years
                        .into_iter()
                        .find(|y| y.year == *year)
                        .map(|y| y.months)
                        .unwrap_or_default();
                }
            }
            let query = DashboardQuery {
                service: args.service.clone(),
                mode,
                top: args.top,
                tag: args.tag.clone(),
                company: args.company.clone(),
            };
            let view = commands::dashboard::run_dashboard_logic(&state, &query)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", render::render_dashboard(&view));
            }
            if let Some(path) = &args.xlsx {
                let result = commands::export::export_excel_dashboard(&view, path)?;
                eprintln!("Workbook written to {} ({} bytes)", result.path, result.size_bytes);
            }
        }
        Commands::Offerings => {
            let offerings = commands::dashboard::get_offerings(&state)?;
            print!("{}", render::render_offerings(&offerings));
        }
        Commands::History => {
            let records = commands::import::get_import_history(&state)?;
            print!("{}", render::render_history(&records));
        }
        Commands::Config { action } => {
            let config = match action {
                ConfigAction::Show => commands::config::get_config(&state)?,
                ConfigAction::Set { key, value } => {
                    commands::config::update_config(&state, &key, &value)?
                }
            };
            print!("{}", render::render_config(&config));
        }
        Commands::Selection { action } => match action {
            SelectionAction::Show => {
                let selection = state.db(|conn| Ok(db::queries::load_selection(conn)?))?;
                print!("{}", render::render_selection(&selection));
            }
            SelectionAction::Clear => {
                commands::dashboard::clear_selection(&state)?;
                println!("Selection cleared");
            }
        },
    }

    Ok(())
}

// ─── E2E Integration Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod e2e_tests {
    use crate::analyzer::dashboard::{NoDataReason, Panel};
    use crate::analyzer::selection::{SELECTED_COMPANY, SELECTED_TAG};
    use crate::analyzer::temporal::FilterMode;
    use crate::commands::dashboard::{run_dashboard_logic, DashboardQuery};
    use crate::source::DataSource;
    use crate::state::{AppState, DbAccess};

    const SHEET: &str = "Services,Tags,Company,Created Date,Finish Date,Priority\n\
        Issue,bug,Acme,05/01/2024 09:30,07/01/2024 09:30,High\n\
        Request,access,Beta,10/02/2024 14:00,,Low\n\
        Issue,bug,Beta,15/02/2024 08:00,16/02/2024 08:00,High\n\
        Task,,Acme,20/02/2024 11:00,,\n\
        Question,howto,Gamma,03/04/2024 16:45,03/04/2024 18:45,Low\n\
        ,,,,,\n\
        Issue,network,Acme,not a date,,Medium\n";

    fn temp_path(name: &str, ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "ticket_dashboard_e2e_{}_{}.{}",
            name,
            std::process::id(),
            ext
        ))
    }

    fn open_state(db_path: &std::path::Path) -> AppState {
        let conn = crate::db::setup::init_db(db_path.to_str().unwrap()).expect("init_db failed");
        AppState::new(conn)
    }

    /// E2E: refresh from a CSV file → render → picks persisted across reopen → export
    #[test]
    fn test_e2e_refresh_render_and_export() {
        let csv_path = temp_path("sheet", "csv");
        let db_path = temp_path("db", "sqlite");
        let xlsx_path = temp_path("report", "xlsx");
        std::fs::write(&csv_path, SHEET).unwrap();
        let _ = std::fs::remove_file(&db_path);

        // 1. Refresh
        let state = open_state(&db_path);
        let source = DataSource::File(csv_path.to_string_lossy().into_owned());
        let result = crate::commands::import::refresh(&state, &source, |_| {})
            .expect("refresh failed");
        assert_eq!(result.total_tickets, 6, "blank row skipped, undated row kept");
        assert_eq!(result.skipped_rows, 1);
        assert_eq!(result.unparsed_created_dates, 1);

        // 2. Whole dataset, February picks
        let view = run_dashboard_logic(
            &state,
            &DashboardQuery {
                company: Some("Beta".into()),
                tag: Some("access".into()),
                ..Default::default()
            },
        )
        .expect("render failed");
        assert_eq!(view.meta.total_tickets, 5, "undated row outside every period");
        let summary = view.summary.data().unwrap();
        let counts: Vec<(&str, usize)> = summary
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect();
        assert_eq!(
            counts,
            vec![("Issue", 2), ("Request", 1), ("Question", 1), ("Task", 1)]
        );
        assert_eq!(view.company_focus.data().unwrap().value, "Beta");
        assert_eq!(view.tag_focus.data().unwrap().value, "access");
        drop(state);

        // 3. Reopen: picks survived; April only holds Gamma/howto
        let state = open_state(&db_path);
        let stored = state
            .db(|conn| Ok(crate::db::queries::load_selection(conn)?))
            .unwrap();
        assert_eq!(stored.get(SELECTED_COMPANY), Some("Beta"));

        let april = run_dashboard_logic(
            &state,
            &DashboardQuery {
                mode: Some(FilterMode::Monthly {
                    year: 2024,
                    month: 4,
                }),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(april.company_focus.data().unwrap().value, "Gamma");
        assert_eq!(april.tag_focus.data().unwrap().value, "howto");
        let stored = state
            .db(|conn| Ok(crate::db::queries::load_selection(conn)?))
            .unwrap();
        assert_eq!(stored.get(SELECTED_TAG), Some("howto"));

        // 4. Empty period: panels degrade, export still succeeds
        let empty = run_dashboard_logic(
            &state,
            &DashboardQuery {
                mode: Some(FilterMode::Daily {
                    start: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
                    end: chrono::NaiveDate::from_ymd_opt(2024, 3, 31),
                }),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(empty.meta.total_tickets, 0);
        assert_eq!(empty.timeline, Panel::NoData(NoDataReason::EmptyResult));

        let export = crate::commands::export::export_excel_dashboard(
            &april,
            xlsx_path.to_str().unwrap(),
        )
        .expect("export failed");
        assert!(export.size_bytes > 0);
        assert!(xlsx_path.exists());

        let history = crate::commands::import::get_import_history(&state).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_active);

        for p in [&csv_path, &db_path, &xlsx_path] {
            let _ = std::fs::remove_file(p);
        }
    }

    fn rust_files(dir: &std::path::Path, out: &mut Vec<std::path::PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                rust_files(&path, out);
            } else if path.extension().is_some_and(|e| e == "rs") {
                out.push(path);
            }
        }
    }

    /// Source lines stay within rustfmt's default width of 100 columns.
    #[test]
    fn test_source_lines_fit_width() {
        let mut files = Vec::new();
        rust_files(&std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), &mut files);
        assert!(!files.is_empty());
        let mut long = Vec::new();
        for file in &files {
            let text = std::fs::read_to_string(file).unwrap();
            for (i, line) in text.lines().enumerate() {
                if line.chars().count() > 100 {
                    long.push(format!("{}:{}", file.display(), i + 1));
                }
            }
        }
        assert!(long.is_empty(), "lines over 100 columns: {:?}", long);
    }
}
