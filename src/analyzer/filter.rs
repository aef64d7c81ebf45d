use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::analyzer::temporal::DateInterval;
use crate::parser::types::{Dataset, Field, Ticket};

pub const ALL_SERVICES: &str = "All";

/// Service category selection: every category or exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SERVICES) {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(trimmed.to_string())
        }
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(service) => ticket.service.as_deref() == Some(service.as_str()),
        }
    }
}

/// Keeps tickets created inside `interval` and belonging to `category`.
/// Tickets without a creation date never match. Input order is preserved.
pub fn filter_tickets<'a>(
    tickets: &'a [Ticket],
    interval: &DateInterval,
    category: &CategoryFilter,
) -> Vec<&'a Ticket> {
    tickets
        .iter()
        .filter(|t| t.created_at.is_some_and(|at| interval.contains(at)))
        .filter(|t| category.matches(t))
        .collect()
}

/// Narrows an already filtered subset to one label value.
pub fn with_label<'a>(subset: &[&'a Ticket], field: Field, value: &str) -> Vec<&'a Ticket> {
    subset
        .iter()
        .copied()
        .filter(|t| t.label(field) == Some(value))
        .collect()
}

// ─── Dataset offerings ───────────────────────────────────────────────────────

/// "All" followed by the distinct services, sorted.
pub fn service_options(dataset: &Dataset) -> Vec<String> {
    let distinct: BTreeSet<&str> = dataset
        .tickets
        .iter()
        .filter_map(|t| t.service.as_deref())
        .collect();
    std::iter::once(ALL_SERVICES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

/// Earliest and latest creation day, if any ticket has one.
pub fn date_bounds(dataset: &Dataset) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = dataset.tickets.iter().filter_map(|t| t.created_at);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), at| (lo.min(at), hi.max(at)));
    Some((min.date(), max.date()))
}

/// Years with at least one ticket, most recent first.
pub fn available_years(dataset: &Dataset) -> Vec<i32> {
    let years: BTreeSet<i32> = dataset
        .tickets
        .iter()
        .filter_map(|t| t.created_at)
        .map(|at| at.year())
        .collect();
    years.into_iter().rev().collect()
}

/// Months of `year` with at least one ticket, in calendar order.
pub fn available_months(dataset: &Dataset, year: i32) -> Vec<u32> {
    let months: BTreeSet<u32> = dataset
        .tickets
        .iter()
        .filter_map(|t| t.created_at)
        .filter(|at| at.year() == year)
        .map(|at| at.month())
        .collect();
    months.into_iter().collect()
}
