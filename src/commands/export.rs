use std::time::Instant;

use serde::Serialize;

use crate::analyzer::dashboard::DashboardView;
use crate::error::AppError;
use crate::export::dashboard_report;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub path: String,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

/// Writes the rendered dashboard to an XLSX workbook at `path`.
pub fn export_excel_dashboard(view: &DashboardView, path: &str) -> Result<ExportResult, AppError> {
    let start = Instant::now();

    let bytes = dashboard_report::generate_dashboard_report(view)?;
    std::fs::write(path, &bytes)?;
    log::info!("Excel export: {} ({} bytes)", path, bytes.len());

    Ok(ExportResult {
        path: path.to_string(),
        size_bytes: bytes.len() as u64,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
