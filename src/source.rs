use std::io::Cursor;
use std::time::Duration;

use crate::error::AppError;
use crate::parser::{parse_csv, parse_csv_reader, ParseOutput};

/// Where a refresh reads the ticket sheet from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(String),
    Url(String),
}

impl DataSource {
    /// A value starting with http(s):// is a URL, anything else a path.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(trimmed.to_string())
        }
    }

    /// Public CSV export of one tab of a Google spreadsheet.
    pub fn google_sheet(sheet_id: &str, gid: &str) -> Self {
        DataSource::Url(format!(
            "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&gid={}",
            sheet_id.trim(),
            gid.trim()
        ))
    }

    pub fn describe(&self) -> &str {
        match self {
            DataSource::File(path) => path,
            DataSource::Url(url) => url,
        }
    }
}

/// Reads and parses the whole sheet.
pub fn load(
    source: &DataSource,
    progress_cb: impl Fn(usize, usize),
) -> Result<ParseOutput, AppError> {
    match source {
        DataSource::File(path) => parse_csv(path, progress_cb),
        DataSource::Url(url) => {
            log::info!("Downloading {}", url);
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?;
            let body = client.get(url).send()?.error_for_status()?.bytes()?;
            log::debug!("{} bytes received", body.len());
            parse_csv_reader(Cursor::new(body), progress_cb)
        }
    }
}
