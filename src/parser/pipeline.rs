use std::collections::BTreeSet;
use std::io::Read;
use std::time::Instant;

use crate::error::AppError;
use crate::parser::columns::{validate_columns, ColumnMap};
use crate::parser::deserializers::{non_empty, parse_day_first_datetime};
use crate::parser::types::{Dataset, Field, ParseWarning, Ticket, TicketRaw};

/// Output of `parse_csv`: the dataset plus import metadata.
/// Used by `commands::import` to persist the snapshot and build `RefreshResult`.
#[derive(Debug)]
pub struct ParseOutput {
    pub dataset: Dataset,
    pub warnings: Vec<ParseWarning>,
    pub total_rows_processed: usize,
    pub skipped_rows: usize,
    pub detected_columns: Vec<String>,
    pub missing_optional_columns: Vec<String>,
    pub unparsed_created_dates: usize,
    pub unique_services: Vec<String>,
    pub parse_duration_ms: u64,
}

/// Parse a spreadsheet CSV export from `path`.
/// `progress_cb(rows_processed, tickets_accepted)` is called every 500 rows.
pub fn parse_csv(path: &str, progress_cb: impl Fn(usize, usize)) -> Result<ParseOutput, AppError> {
    let file = std::fs::File::open(path)?;
    parse_csv_reader(std::io::BufReader::new(file), progress_cb)
}

/// Core parsing logic over any `Read` source.
pub fn parse_csv_reader<R: Read>(
    reader: R,
    progress_cb: impl Fn(usize, usize),
) -> Result<ParseOutput, AppError> {
    let start = Instant::now();

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .double_quote(true)
        .quoting(true)
        .from_reader(reader);

    // Phase 1: validate columns
    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::EmptyFile);
    }
    let col_map = ColumnMap::from_headers(&headers);
    let col_validation = validate_columns(&col_map);
    let has_created = col_map.has(Field::CreatedDate.column());
    for missing in &col_validation.missing_optional {
        log::warn!("Missing column: {}", missing);
    }
    let passthrough = col_map.passthrough();

    // Phase 2: parse and normalise records
    let mut tickets: Vec<Ticket> = Vec::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();
    let mut skipped = 0usize;
    let mut unparsed_created = 0usize;
    let mut row_idx = 0usize;
    let mut unique_services: BTreeSet<String> = BTreeSet::new();

    for result in rdr.records() {
        row_idx += 1;
        if row_idx % 500 == 0 {
            progress_cb(row_idx, tickets.len());
        }

        match result {
            Ok(record) => {
                if record.iter().all(|cell| cell.trim().is_empty()) {
                    skipped += 1;
                    continue;
                }
                let raw = record_to_raw(&col_map, &record);
                let mut ticket = normalize_ticket(&raw);
                if has_created && ticket.created_at.is_none() {
                    unparsed_created += 1;
                    if raw.created_date.as_deref().is_some_and(|s| !s.trim().is_empty()) {
                        warnings.push(ParseWarning {
                            line: row_idx + 1, // +1 for the header row
                            message: format!(
                                "Created Date illisible: {:?}",
                                raw.created_date.as_deref().unwrap_or("")
                            ),
                        });
                    }
                }
                ticket.extra = passthrough
                    .iter()
                    .map(|(i, name)| (name.clone(), record.get(*i).unwrap_or("").to_string()))
                    .collect();
                if let Some(service) = &ticket.service {
                    unique_services.insert(service.clone());
                }
                tickets.push(ticket);
            }
            Err(err) => {
                warnings.push(ParseWarning {
                    line: row_idx + 1,
                    message: err.to_string(),
                });
                skipped += 1;
            }
        }
    }

    if row_idx == 0 {
        return Err(AppError::EmptyFile);
    }

    if unparsed_created > 0 {
        log::warn!(
            "{} row(s) without a usable Created Date, left out of dated views",
            unparsed_created
        );
    }

    Ok(ParseOutput {
        dataset: Dataset {
            tickets,
            fields: col_validation.present,
            extra_columns: passthrough.into_iter().map(|(_, name)| name).collect(),
        },
        warnings,
        total_rows_processed: row_idx,
        skipped_rows: skipped,
        detected_columns: col_map.all_headers().to_vec(),
        missing_optional_columns: col_validation.missing_optional,
        unparsed_created_dates: unparsed_created,
        unique_services: unique_services.into_iter().collect(),
        parse_duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn record_to_raw(col_map: &ColumnMap, record: &csv::StringRecord) -> TicketRaw {
    let get = |col: &str| col_map.get(record, col).map(str::to_string);
    TicketRaw {
        services: get("Services"),
        tags: get("Tags"),
        company: get("Company"),
        created_date: get("Created Date"),
        finish_date: get("Finish Date"),
    }
}

fn normalize_ticket(raw: &TicketRaw) -> Ticket {
    Ticket {
        service: raw.services.as_deref().and_then(non_empty),
        tags: raw.tags.as_deref().and_then(non_empty),
        company: raw.company.as_deref().and_then(non_empty),
        created_at: raw.created_date.as_deref().and_then(parse_day_first_datetime),
        finish_at: raw.finish_date.as_deref().and_then(parse_day_first_datetime),
        extra: Vec::new(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HDR: &str = "No,Services,Tags,Company,Created Date,Finish Date";

    fn parse(csv: &str) -> ParseOutput {
        parse_csv_reader(csv.as_bytes(), |_, _| {}).unwrap()
    }

    #[test]
    fn test_parse_basic_rows() {
        let csv = format!(
            "{HDR}\n\
             1,Issue,bug,Acme,05/01/2024 10:00,06/01/2024 12:00\n\
             2,Request,bug,Beta,10/02/2024,\n"
        );
        let out = parse(&csv);
        assert_eq!(out.dataset.tickets.len(), 2);
        assert_eq!(out.total_rows_processed, 2);
        assert_eq!(out.skipped_rows, 0);

        let t = &out.dataset.tickets[0];
        assert_eq!(t.service.as_deref(), Some("Issue"));
        assert_eq!(t.tags.as_deref(), Some("bug"));
        assert_eq!(t.company.as_deref(), Some("Acme"));
        assert_eq!(
            t.created_at.unwrap().format("%Y-%m-%d").to_string(),
            "2024-01-05"
        );
        assert!(t.finish_at.is_some());
        assert_eq!(t.extra, vec![("No".to_string(), "1".to_string())]);

        assert!(out.dataset.tickets[1].finish_at.is_none());
        assert_eq!(out.unique_services, vec!["Issue", "Request"]);
    }

    #[test]
    fn test_blank_labels_are_absent() {
        let csv = format!("{HDR}\n1,Issue,  ,,05/01/2024,\n");
        let out = parse(&csv);
        let t = &out.dataset.tickets[0];
        assert!(t.tags.is_none());
        assert!(t.company.is_none());
    }

    #[test]
    fn test_unparseable_created_date_kept_as_absent() {
        let csv = format!("{HDR}\n1,Issue,bug,Acme,hier,\n2,Task,ops,Acme,,\n");
        let out = parse(&csv);
        assert_eq!(out.dataset.tickets.len(), 2);
        assert!(out.dataset.tickets.iter().all(|t| t.created_at.is_none()));
        assert_eq!(out.unparsed_created_dates, 2);
        // Only the non-empty garbage cell produces a warning
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 2);
    }

    #[test]
    fn test_missing_optional_columns_reported() {
        let csv = "Services,Created Date\nIssue,05/01/2024\n";
        let out = parse(csv);
        assert!(out.dataset.has(Field::Services));
        assert!(!out.dataset.has(Field::Tags));
        assert!(out.missing_optional_columns.contains(&"Tags".to_string()));
        assert!(out.dataset.tickets[0].tags.is_none());
    }

    #[test]
    fn test_missing_created_date_column_keeps_rows() {
        let out = parse("Services,Tags,Company\nIssue,bug,Acme\n");
        assert_eq!(out.dataset.tickets.len(), 1);
        assert!(!out.dataset.has(Field::CreatedDate));
        assert!(out.dataset.tickets[0].created_at.is_none());
        assert_eq!(out.dataset.tickets[0].company.as_deref(), Some("Acme"));
        assert!(out.missing_optional_columns.contains(&"Created Date".to_string()));
        // Column absent: nothing unreadable to report
        assert_eq!(out.unparsed_created_dates, 0);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_header_only_is_empty_file() {
        let err = parse_csv_reader(format!("{HDR}\n").as_bytes(), |_, _| {}).unwrap_err();
        assert!(matches!(err, AppError::EmptyFile));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = format!("{HDR}\n1,Issue,bug,Acme,05/01/2024,\n,,,,,\n");
        let out = parse(&csv);
        assert_eq!(out.dataset.tickets.len(), 1);
        assert_eq!(out.skipped_rows, 1);
    }

    #[test]
    fn test_quoted_cells_with_commas() {
        let csv = format!("{HDR}\n1,Issue,\"login, sso\",\"Acme, Inc\",05/01/2024,\n");
        let out = parse(&csv);
        let t = &out.dataset.tickets[0];
        assert_eq!(t.tags.as_deref(), Some("login, sso"));
        assert_eq!(t.company.as_deref(), Some("Acme, Inc"));
    }
}
