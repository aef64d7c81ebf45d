use chrono::NaiveDateTime;
use rust_xlsxwriter::{Chart, ChartType, Workbook, Worksheet, XlsxError};

use crate::analyzer::aggregate::{BucketCount, RankEntry};
use crate::analyzer::dashboard::{DashboardView, FocusSeries, Panel};
use crate::error::AppError;
use crate::export::{
    create_header_format, create_integer_format, create_muted_format, create_number_format,
    create_title_format,
};
use crate::parser::types::Field;

const TIMELINE_SHEET: &str = "Timeline";
const DISPLAY_DT_FMT: &str = "%d/%m/%Y %H:%M";

/// Classeur 4 onglets : Summary, Rankings, Timeline, Details.
/// Returns the XLSX bytes from workbook.save_to_buffer().
pub fn generate_dashboard_report(view: &DashboardView) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_summary(&mut wb, view)?;
    write_rankings(&mut wb, view)?;
    write_timeline(&mut wb, view)?;
    write_details(&mut wb, view)?;
    Ok(wb.save_to_buffer()?)
}

/// Writes the panel's reason in place of its table. Returns true if data follows.
fn no_data_note<T>(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    panel: &Panel<T>,
) -> Result<bool, XlsxError> {
    match panel {
        Panel::Data(_) => Ok(true),
        Panel::NoData(reason) => {
            let note = reason.to_string();
            ws.write_with_format(row, col, note.as_str(), &create_muted_format())?;
            Ok(false)
        }
    }
}

// ── Onglet 1 : Summary ───────────────────────────────────────────────────────

fn write_summary(wb: &mut Workbook, view: &DashboardView) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Summary")?;

    let hdr = create_header_format();
    let title = create_title_format();
    let int = create_integer_format();
    let num = create_number_format();

    ws.write_with_format(0, 0, "Ticket dashboard", &title)?;
    let meta: [(&str, String); 4] = [
        ("Service", view.meta.category.clone()),
        ("Period", view.meta.mode.to_string()),
        ("Ranking size", view.meta.top.clone()),
        ("Tickets in selection", view.meta.total_tickets.to_string()),
    ];
    for (i, (label, value)) in meta.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, *label)?;
        ws.write(row, 1, value.as_str())?;
    }

    let mut row = meta.len() as u32 + 2;
    ws.write_with_format(row, 0, "Category", &hdr)?;
    ws.write_with_format(row, 1, "Tickets", &hdr)?;
    row += 1;
    if no_data_note(ws, row, 0, &view.summary)? {
        for c in view.summary.data().into_iter().flatten() {
            ws.write(row, 0, c.category.as_str())?;
            ws.write_with_format(row, 1, c.count as f64, &int)?;
            row += 1;
        }
    } else {
        row += 1;
    }

    row += 1;
    ws.write_with_format(row, 0, "Resolution time (days)", &hdr)?;
    ws.write_with_format(row, 1, "Value", &hdr)?;
    row += 1;
    if no_data_note(ws, row, 0, &view.resolution)? {
        if let Some(r) = view.resolution.data() {
            ws.write(row, 0, "Finished tickets")?;
            ws.write_with_format(row, 1, r.echantillon as f64, &int)?;
            ws.write(row + 1, 0, "Mean")?;
            ws.write_with_format(row + 1, 1, r.moyenne_jours, &num)?;
            ws.write(row + 2, 0, "Median")?;
            ws.write_with_format(row + 2, 1, r.mediane_jours, &num)?;
            ws.write(row + 3, 0, "90th percentile")?;
            ws.write_with_format(row + 3, 1, r.p90_jours, &num)?;
        }
    }

    ws.set_column_width(0, 26)?;
    ws.set_column_width(1, 28)?;
    Ok(())
}

// ── Onglet 2 : Rankings ──────────────────────────────────────────────────────

fn write_ranking_block(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    heading: &str,
    panel: &Panel<Vec<RankEntry>>,
) -> Result<u32, XlsxError> {
    let hdr = create_header_format();
    let int = create_integer_format();

    ws.write_with_format(row, col, heading, &hdr)?;
    ws.write_with_format(row, col + 1, "Tickets", &hdr)?;
    let mut r = row + 1;
    if !no_data_note(ws, r, col, panel)? {
        return Ok(r + 1);
    }
    for entry in panel.data().into_iter().flatten() {
        ws.write(r, col, entry.label.as_str())?;
        ws.write_with_format(r, col + 1, entry.count as f64, &int)?;
        r += 1;
    }
    Ok(r)
}

fn write_rankings(wb: &mut Workbook, view: &DashboardView) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Rankings")?;
    let title = create_title_format();

    let tags_title = format!("Top tags ({})", view.meta.top);
    let companies_title = format!("Top companies ({})", view.meta.top);
    ws.write_with_format(0, 0, tags_title.as_str(), &title)?;
    ws.write_with_format(0, 3, companies_title.as_str(), &title)?;
    let end_tags = write_ranking_block(ws, 1, 0, "Tag", &view.tag_ranking)?;
    let end_companies = write_ranking_block(ws, 1, 3, "Company", &view.company_ranking)?;

    // Per-category blocks, only when every category is shown
    let mut row = end_tags.max(end_companies) + 1;
    if let (Some(tags), Some(companies)) =
        (&view.top_tags_by_category, &view.top_companies_by_category)
    {
        for (tag_block, company_block) in tags.iter().zip(companies) {
            ws.write_with_format(row, 0, tag_block.category.as_str(), &title)?;
            let a = write_ranking_block(ws, row + 1, 0, "Tag", &tag_block.ranking)?;
            let b = write_ranking_block(ws, row + 1, 3, "Company", &company_block.ranking)?;
            row = a.max(b) + 1;
        }
    }

    ws.set_column_width(0, 30)?;
    ws.set_column_width(1, 10)?;
    ws.set_column_width(3, 30)?;
    ws.set_column_width(4, 10)?;
    Ok(())
}

// ── Onglet 3 : Timeline ──────────────────────────────────────────────────────

fn write_series(
    ws: &mut Worksheet,
    col: u16,
    heading: &str,
    series: &[BucketCount],
) -> Result<(), XlsxError> {
    let hdr = create_header_format();
    let int = create_integer_format();
    ws.write_with_format(0, col, heading, &hdr)?;
    ws.write_with_format(0, col + 1, "Tickets", &hdr)?;
    for (i, b) in series.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, col, b.bucket.as_str())?;
        ws.write_with_format(row, col + 1, b.count as f64, &int)?;
    }
    Ok(())
}

fn column_chart(title: &str, col: u16, len: usize) -> Chart {
    let last = len as u32;
    let mut chart = Chart::new(ChartType::Column);
    chart
        .add_series()
        .set_categories((TIMELINE_SHEET, 1, col, last, col))
        .set_values((TIMELINE_SHEET, 1, col + 1, last, col + 1))
        .set_name("Tickets");
    chart.title().set_name(title);
    chart.legend().set_hidden();
    chart
}

fn write_focus(
    ws: &mut Worksheet,
    col: u16,
    kind: &str,
    panel: &Panel<FocusSeries>,
    chart_row: u32,
) -> Result<(), XlsxError> {
    match panel {
        Panel::Data(focus) => {
            let heading = format!("{}: {} ({})", kind, focus.value, focus.total);
            write_series(ws, col, &heading, &focus.series)?;
            if !focus.series.is_empty() {
                let chart = column_chart(&heading, col, focus.series.len());
                ws.insert_chart(chart_row, 9, &chart)?;
            }
        }
        Panel::NoData(_) => {
            ws.write_with_format(0, col, kind, &create_header_format())?;
            no_data_note(ws, 1, col, panel)?;
        }
    }
    Ok(())
}

fn write_timeline(wb: &mut Workbook, view: &DashboardView) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name(TIMELINE_SHEET)?;

    match &view.timeline {
        Panel::Data(series) => {
            write_series(ws, 0, "Period", series)?;
            if !series.is_empty() {
                let chart = column_chart("Tickets per period", 0, series.len());
                ws.insert_chart(1, 9, &chart)?;
            }
        }
        Panel::NoData(_) => {
            ws.write_with_format(0, 0, "Period", &create_header_format())?;
            no_data_note(ws, 1, 0, &view.timeline)?;
        }
    }
    write_focus(ws, 3, "Tag", &view.tag_focus, 17)?;
    write_focus(ws, 6, "Company", &view.company_focus, 33)?;

    for col in [0u16, 3, 6] {
        ws.set_column_width(col, 22)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

// ── Onglet 4 : Details ───────────────────────────────────────────────────────

fn write_details(wb: &mut Workbook, view: &DashboardView) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Details")?;

    let hdr = create_header_format();
    let table = match &view.details {
        Panel::Data(t) => t,
        Panel::NoData(_) => {
            no_data_note(ws, 0, 0, &view.details)?;
            return Ok(());
        }
    };

    let mut headers: Vec<&str> = Field::ALL.iter().map(|f| f.column()).collect();
    headers.extend(table.extra_columns.iter().map(String::as_str));
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    let fmt_dt = |d: Option<NaiveDateTime>| {
        d.map(|d| d.format(DISPLAY_DT_FMT).to_string())
            .unwrap_or_default()
    };
    for (i, t) in table.rows.iter().enumerate() {
        let row = (i + 1) as u32;
        let base = [
            t.service.clone().unwrap_or_default(),
            t.tags.clone().unwrap_or_default(),
            t.company.clone().unwrap_or_default(),
            fmt_dt(t.created_at),
            fmt_dt(t.finish_at),
        ];
        for (col, value) in base.iter().enumerate() {
            ws.write(row, col as u16, value.as_str())?;
        }
        for (j, column) in table.extra_columns.iter().enumerate() {
            let value = t
                .extra
                .iter()
                .find(|(k, _)| k == column)
                .map(|(_, v)| v.as_str())
                .unwrap_or("");
            ws.write(row, (base.len() + j) as u16, value)?;
        }
    }

    let last_row = table.rows.len() as u32;
    ws.set_freeze_panes(1, 0)?;
    ws.autofilter(0, 0, last_row, (headers.len() - 1) as u16)?;
    for col in 0..headers.len() {
        ws.set_column_width(col as u16, 18)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::aggregate::TopN;
    use crate::analyzer::dashboard::{build_dashboard, DashboardRequest};
    use crate::analyzer::filter::CategoryFilter;
    use crate::analyzer::selection::SelectionState;
    use crate::analyzer::temporal::FilterMode;
    use crate::parser::parse_csv_reader;
    use chrono::NaiveDate;

    fn categories() -> Vec<String> {
        vec!["Issue".into(), "Request".into(), "Question".into(), "Task".into()]
    }

    fn view_for(csv: &str, mode: FilterMode) -> DashboardView {
        let dataset = parse_csv_reader(csv.as_bytes(), |_, _| {}).unwrap().dataset;
        let request = DashboardRequest {
            category: CategoryFilter::All,
            mode,
            top: TopN::Limit(5),
            tag: None,
            company: None,
        };
        build_dashboard(&dataset, &request, &categories(), &mut SelectionState::new()).unwrap()
    }

    fn january() -> FilterMode {
        FilterMode::Daily {
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            end: NaiveDate::from_ymd_opt(2024, 1, 31),
        }
    }

    #[test]
    fn test_generate_dashboard_report_xlsx_signature() {
        let view = view_for(
            "Services,Tags,Company,Created Date,Finish Date,Priority\n\
             Issue,bug,Acme,05/01/2024 09:00,08/01/2024 09:00,High\n\
             Task,ops,Beta,12/01/2024 10:00,,Low\n",
            january(),
        );
        let result = generate_dashboard_report(&view);
        assert!(result.is_ok(), "generate_dashboard_report failed: {:?}", result.err());
        let bytes = result.unwrap();
        assert!(bytes.len() > 4, "XLSX too small");
        // ZIP magic bytes PK (0x50 0x4B)
        assert_eq!(bytes[0], 0x50, "Expected PK signature byte 0");
        assert_eq!(bytes[1], 0x4B, "Expected PK signature byte 1");
    }

    #[test]
    fn test_generate_dashboard_report_without_data() {
        // No ticket in the period and optional columns absent
        let view = view_for("Created Date\n05/03/2024\n", january());
        let bytes = generate_dashboard_report(&view).unwrap();
        assert_eq!(bytes[0], 0x50);
        assert_eq!(bytes[1], 0x4B);
    }
}
