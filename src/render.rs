//! Terminal rendering of command results.

use std::fmt::Write as _;

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;

use crate::analyzer::aggregate::{BucketCount, RankEntry};
use crate::analyzer::dashboard::{DashboardView, FocusSeries, Panel};
use crate::analyzer::selection::SelectionState;
use crate::commands::dashboard::DatasetOfferings;
use crate::commands::import::{ImportRecord, RefreshResult};
use crate::config::AppConfig;
use crate::parser::types::Field;

const BAR_WIDTH: usize = 40;
const DISPLAY_DT_FMT: &str = "%d/%m/%Y %H:%M";

fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n== {} ==", title);
}

fn panel_or_note<'a, T>(out: &mut String, panel: &'a Panel<T>) -> Option<&'a T> {
    match panel {
        Panel::Data(d) => Some(d),
        Panel::NoData(reason) => {
            let _ = writeln!(out, "  ({})", reason);
            None
        }
    }
}

fn ranking_table(label: &str, entries: &[RankEntry]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["#", label, "Tickets"]);
    for (i, e) in entries.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), e.label.clone(), e.count.to_string()]);
    }
    table
}

/// Horizontal bars scaled to the largest bucket.
pub fn bar_chart(series: &[BucketCount]) -> String {
    let max = series.iter().map(|b| b.count).max().unwrap_or(0);
    let label_width = series.iter().map(|b| b.bucket.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for b in series {
        let len = if max == 0 { 0 } else { (b.count * BAR_WIDTH).div_ceil(max) };
        let _ = writeln!(
            out,
            "  {:>width$} | {} {}",
            b.bucket,
            "█".repeat(len),
            b.count,
            width = label_width
        );
    }
    out
}

fn focus_section(out: &mut String, kind: &str, panel: &Panel<FocusSeries>) {
    heading(out, &format!("{} focus", kind));
    if let Some(focus) = panel_or_note(out, panel) {
        let _ = writeln!(out, "  {} ({} tickets)", focus.value, focus.total);
        out.push_str(&bar_chart(&focus.series));
    }
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    let meta = &view.meta;
    let _ = writeln!(
        out,
        "Service: {}  |  Period: {}  |  {}  |  {} tickets",
        meta.category, meta.mode, meta.top, meta.total_tickets
    );

    heading(&mut out, "Summary");
    if let Some(counts) = panel_or_note(&mut out, &view.summary) {
        let mut table = create_table();
        table.set_header(counts.iter().map(|c| c.category.clone()).collect::<Vec<_>>());
        table.add_row(counts.iter().map(|c| c.count.to_string()).collect::<Vec<_>>());
        let _ = writeln!(out, "{table}");
    }

    heading(&mut out, "Resolution time");
    if let Some(r) = panel_or_note(&mut out, &view.resolution) {
        let _ = writeln!(
            out,
            "  {} finished: mean {:.1} d, median {:.1} d, p90 {:.1} d",
            r.echantillon, r.moyenne_jours, r.mediane_jours, r.p90_jours
        );
    }

    if let (Some(tags), Some(companies)) =
        (&view.top_tags_by_category, &view.top_companies_by_category)
    {
        for (tag_block, company_block) in tags.iter().zip(companies) {
            heading(&mut out, &format!("{}: top tags", tag_block.category));
            if let Some(entries) = panel_or_note(&mut out, &tag_block.ranking) {
                let _ = writeln!(out, "{}", ranking_table("Tag", entries));
            }
            heading(&mut out, &format!("{}: top companies", company_block.category));
            if let Some(entries) = panel_or_note(&mut out, &company_block.ranking) {
                let _ = writeln!(out, "{}", ranking_table("Company", entries));
            }
        }
    }

    heading(&mut out, &format!("Tags ({})", meta.top));
    if let Some(entries) = panel_or_note(&mut out, &view.tag_ranking) {
        let _ = writeln!(out, "{}", ranking_table("Tag", entries));
    }
    heading(&mut out, &format!("Companies ({})", meta.top));
    if let Some(entries) = panel_or_note(&mut out, &view.company_ranking) {
        let _ = writeln!(out, "{}", ranking_table("Company", entries));
    }

    heading(&mut out, "Tickets over time");
    if let Some(series) = panel_or_note(&mut out, &view.timeline) {
        out.push_str(&bar_chart(series));
    }

    focus_section(&mut out, "Tag", &view.tag_focus);
    focus_section(&mut out, "Company", &view.company_focus);

    heading(&mut out, "Details");
    if let Some(details) = panel_or_note(&mut out, &view.details) {
        let mut table = create_table();
        let mut header: Vec<String> = Field::ALL.iter().map(|f| f.column().to_string()).collect();
        header.extend(details.extra_columns.iter().cloned());
        table.set_header(header);
        for t in &details.rows {
            let fmt_dt = |d: Option<chrono::NaiveDateTime>| {
                d.map(|d| d.format(DISPLAY_DT_FMT).to_string()).unwrap_or_default()
            };
            let mut row = vec![
                t.service.clone().unwrap_or_default(),
                t.tags.clone().unwrap_or_default(),
                t.company.clone().unwrap_or_default(),
                fmt_dt(t.created_at),
                fmt_dt(t.finish_at),
            ];
            for column in &details.extra_columns {
                row.push(
                    t.extra
                        .iter()
                        .find(|(k, _)| k == column)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default(),
                );
            }
            table.add_row(row);
        }
        let _ = writeln!(out, "{table}");
    }

    out
}

pub fn render_refresh(result: &RefreshResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Snapshot #{} loaded from {}", result.import_id, result.source);
    let _ = writeln!(
        out,
        "  {} tickets, {} blank rows skipped, {} unreadable creation dates",
        result.total_tickets, result.skipped_rows, result.unparsed_created_dates
    );
    if !result.missing_optional_columns.is_empty() {
        let _ = writeln!(
            out,
            "  Missing columns: {}",
            result.missing_optional_columns.join(", ")
        );
    }
    if !result.unique_services.is_empty() {
        let _ = writeln!(out, "  Services: {}", result.unique_services.join(", "));
    }
    out
}

pub fn render_history(records: &[ImportRecord]) -> String {
    if records.is_empty() {
        return "No refresh yet\n".to_string();
    }
    let mut table = create_table();
    table.set_header(vec!["#", "Date", "Source", "Rows", "Tickets", "From", "To", "Active"]);
    for r in records {
        table.add_row(vec![
            r.id.to_string(),
            r.import_date.clone(),
            r.source.clone(),
            r.total_rows.to_string(),
            r.parsed_rows.to_string(),
            r.date_range_from.clone().unwrap_or_default(),
            r.date_range_to.clone().unwrap_or_default(),
            if r.is_active { "yes" } else { "" }.to_string(),
        ]);
    }
    format!("{table}\n")
}

pub fn render_config(config: &AppConfig) -> String {
    let mut table = create_table();
    table.set_header(vec!["Key", "Value"]);
    table.add_row(vec![
        "source_url".to_string(),
        config.source_url.clone().unwrap_or_default(),
    ]);
    table.add_row(vec!["categories".to_string(), config.categories.join(", ")]);
    table.add_row(vec!["default_top_n".to_string(), config.default_top_n.to_string()]);
    format!("{table}\n")
}

pub fn render_offerings(offerings: &DatasetOfferings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Services: {}", offerings.services.join(", "));
    if let (Some(lo), Some(hi)) = (offerings.date_min, offerings.date_max) {
        let _ = writeln!(out, "Dates: {} to {}", lo, hi);
    }
    for y in &offerings.years {
        let months: Vec<&str> = y
            .months
            .iter()
            .map(|m| crate::analyzer::temporal::month_name(*m))
            .collect();
        let _ = writeln!(out, "  {}: {}", y.year, months.join(", "));
    }
    let _ = writeln!(out, "Ranking sizes: {}", offerings.top_choices.join(", "));
    out
}

pub fn render_selection(selection: &SelectionState) -> String {
    let mut out = String::new();
    let mut empty = true;
    for (key, value) in selection.iter() {
        let _ = writeln!(out, "{} = {}", key, value);
        empty = false;
    }
    if empty {
        out.push_str("No remembered selection\n");
    }
    out
}
