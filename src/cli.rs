//! Command-line surface of the `ticket-dashboard` binary.

use std::str::FromStr;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::analyzer::aggregate::TopN;
use crate::analyzer::temporal::{parse_month, FilterMode};
use crate::source::DataSource;

pub const DEFAULT_DB_PATH: &str = "ticket_dashboard.db";

/// Ticket statistics dashboard backed by a refreshed CSV snapshot
#[derive(Parser, Debug)]
#[command(name = "ticket-dashboard")]
#[command(author, version)]
#[command(after_help = "EXAMPLES:
    # Load a public Google Sheet tab
    ticket-dashboard refresh --sheet 1AbC... --gid 0

    # February 2024, Issue tickets only, top 10 rankings
    ticket-dashboard dashboard --service Issue --month 2024-02 --top 10

    # A few months of 2023 exported to Excel
    ticket-dashboard dashboard --year 2023 --months jan,mar,apr --xlsx report.xlsx
")]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// SQLite database holding the snapshot, settings and selections
    #[arg(long, env = "TICKET_DASHBOARD_DB", default_value = DEFAULT_DB_PATH, global = true)]
    pub db: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read the whole sheet and replace the stored snapshot
    Refresh(RefreshArgs),

    /// Render the dashboard for a service and a period
    Dashboard(DashboardArgs),

    /// List services, date span and months available for filtering
    Offerings,

    /// Show past refreshes, newest first
    History,

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show or clear the remembered tag/company picks
    Selection {
        #[command(subcommand)]
        action: SelectionAction,
    },
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// CSV file path or http(s) URL; defaults to the configured source_url
    pub source: Option<String>,

    /// Google spreadsheet id (public sheet)
    #[arg(long, conflicts_with = "source")]
    pub sheet: Option<String>,

    /// Tab id inside the spreadsheet
    #[arg(long, default_value = "0", requires = "sheet")]
    pub gid: String,
}

impl RefreshArgs {
    pub fn data_source(&self) -> Option<DataSource> {
        match (&self.sheet, &self.source) {
            (Some(id), _) => Some(DataSource::google_sheet(id, &self.gid)),
            (None, Some(s)) => Some(DataSource::parse(s)),
            (None, None) => None,
        }
    }
}

/// `YYYY-MM`, as accepted by `--month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM: {}", s))?;
        let year = y.parse().map_err(|_| format!("invalid year: {}", y))?;
        let month = parse_month(m).ok_or_else(|| format!("invalid month: {}", m))?;
        Ok(YearMonth { year, month })
    }
}

fn parse_month_arg(s: &str) -> Result<u32, String> {
    parse_month(s).ok_or_else(|| format!("invalid month: {}", s))
}

#[derive(Args, Debug, Default)]
pub struct DashboardArgs {
    /// Service category, or "All"
    #[arg(short, long)]
    pub service: Option<String>,

    /// First day of a daily range (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["month", "year"])]
    pub from: Option<NaiveDate>,

    /// Last day of a daily range, inclusive (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["month", "year"])]
    pub to: Option<NaiveDate>,

    /// One month (YYYY-MM)
    #[arg(long, conflicts_with = "year")]
    pub month: Option<YearMonth>,

    /// One year; combine with --months
    #[arg(long)]
    pub year: Option<i32>,

    /// Months of --year, by number or name; defaults to every month with data
    #[arg(long, value_delimiter = ',', requires = "year", value_parser = parse_month_arg)]
    pub months: Vec<u32>,

    /// Ranking size: 5, 10, 20 or all
    #[arg(short, long)]
    pub top: Option<TopN>,

    /// Tag to focus on
    #[arg(long)]
    pub tag: Option<String>,

    /// Company to focus on
    #[arg(long)]
    pub company: Option<String>,

    /// Print the view as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write the view to an Excel workbook
    #[arg(long, value_name = "PATH")]
    pub xlsx: Option<String>,
}

impl DashboardArgs {
    /// Period picked on the command line. None when nothing was given;
    /// a yearly pick without months comes back with an empty list.
    pub fn filter_mode(&self) -> Option<FilterMode> {
        if let Some(ym) = self.month {
            return Some(FilterMode::Monthly {
                year: ym.year,
                month: ym.month,
            });
        }
        if let Some(year) = self.year {
            return Some(FilterMode::Yearly {
                year,
                months: self.months.clone(),
            });
        }
        if self.from.is_some() || self.to.is_some() {
            return Some(FilterMode::Daily {
                start: self.from,
                end: self.to,
            });
        }
        None
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print every setting
    Show,
    /// Change one setting (source_url, categories, default_top_n)
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum SelectionAction {
    Show,
    Clear,
}
