use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fixed month vocabulary used for yearly buckets, in calendar order.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[(month - 1) as usize],
        _ => "Unknown",
    }
}

/// Accepts a month number ("3") or an English name, full or abbreviated ("Mar").
pub fn parse_month(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let lower = trimmed.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| name.to_lowercase().starts_with(&lower))
        .map(|i| i as u32 + 1)
}

/// How the operator picked the reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum FilterMode {
    /// Inclusive calendar-day range. Either bound may still be missing while
    /// the operator is picking.
    Daily {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    Monthly { year: i32, month: u32 },
    /// Months of one year; not necessarily contiguous.
    Yearly { year: i32, months: Vec<u32> },
}

impl FilterMode {
    pub fn granularity(&self) -> Granularity {
        match self {
            FilterMode::Daily { .. } => Granularity::Day,
            FilterMode::Monthly { .. } => Granularity::DayOfMonth,
            FilterMode::Yearly { .. } => Granularity::Month,
        }
    }

    /// Selected months in calendar order, only meaningful in yearly mode.
    pub fn months_filter(&self) -> Option<Vec<u32>> {
        match self {
            FilterMode::Yearly { months, .. } => {
                let mut sorted = months.clone();
                sorted.sort_unstable();
                sorted.dedup();
                Some(sorted)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Daily { start, end } => {
                let show = |d: &Option<NaiveDate>| {
                    d.map_or_else(|| "?".to_string(), |d| d.to_string())
                };
                write!(f, "{} to {}", show(start), show(end))
            }
            FilterMode::Monthly { year, month } => write!(f, "{} {}", month_name(*month), year),
            FilterMode::Yearly { year, months } => {
                let names: Vec<&str> = self
                    .months_filter()
                    .unwrap_or_else(|| months.clone())
                    .into_iter()
                    .map(month_name)
                    .collect();
                write!(f, "{} ({})", year, names.join(", "))
            }
        }
    }
}

/// Time-series bucketing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Granularity {
    Day,
    DayOfMonth,
    Month,
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateInterval {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    /// Last calendar day covered by the interval.
    pub fn last_day(&self) -> NaiveDate {
        (self.end - Duration::days(1)).date()
    }
}

/// Turns a filter mode into a concrete `[start, end)` interval.
pub fn resolve(mode: &FilterMode) -> Result<DateInterval, AppError> {
    match mode {
        FilterMode::Daily { start, end } => {
            let (d0, d1) = match (start, end) {
                (Some(d0), Some(d1)) => (*d0, *d1),
                (None, None) => {
                    return Err(AppError::InvalidSelection(
                        "pick a start date and an end date".into(),
                    ))
                }
                _ => {
                    return Err(AppError::InvalidSelection(
                        "incomplete range, pick the second date too".into(),
                    ))
                }
            };
            if d0 > d1 {
                return Err(AppError::InvalidSelection(format!(
                    "start date {} is after end date {}",
                    d0, d1
                )));
            }
            Ok(DateInterval {
                start: midnight(d0),
                end: midnight(d1 + Duration::days(1)),
            })
        }
        FilterMode::Monthly { year, month } => {
            let (start, end) = month_bounds(*year, *month)?;
            Ok(DateInterval { start, end })
        }
        FilterMode::Yearly { year, months } => {
            let (Some(first), Some(last)) = (months.iter().min(), months.iter().max()) else {
                return Err(AppError::InvalidSelection(format!(
                    "no month selected for {}",
                    year
                )));
            };
            let (start, _) = month_bounds(*year, *first)?;
            let (_, end) = month_bounds(*year, *last)?;
            Ok(DateInterval { start, end })
        }
    }
}

/// First instant of `month` and first instant of the following month.
fn month_bounds(year: i32, month: u32) -> Result<(NaiveDateTime, NaiveDateTime), AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidSelection(format!("invalid month: {}-{}", year, month)))?;
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::InvalidSelection(format!("invalid month: {}-{}", year, month)))?;
    Ok((midnight(first), midnight(next_month_first)))
}

fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_time(chrono::NaiveTime::MIN)
}

/// Label of a bucket for the given granularity.
pub fn bucket_label(at: NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => at.format("%Y-%m-%d").to_string(),
        Granularity::DayOfMonth => at.day().to_string(),
        Granularity::Month => month_name(at.month()).to_string(),
    }
}
