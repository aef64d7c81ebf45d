use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::analyzer::temporal::{month_name, Granularity};
use crate::parser::types::{Field, Ticket};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub bucket: String,
    pub count: usize,
}

/// Ranking length cap. The display offers 5, 10, 20 or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TopN {
    Limit(usize),
    All,
}

impl TopN {
    pub const CHOICES: [TopN; 4] = [TopN::Limit(5), TopN::Limit(10), TopN::Limit(20), TopN::All];
}

impl Default for TopN {
    fn default() -> Self {
        TopN::Limit(5)
    }
}

impl fmt::Display for TopN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopN::Limit(n) => write!(f, "Top {}", n),
            TopN::All => f.write_str("All"),
        }
    }
}

impl FromStr for TopN {
    type Err = String;

    /// Accepts "5", "Top 10", "all"… but only the caps offered by the display.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "all" {
            return Ok(TopN::All);
        }
        let digits = lower.strip_prefix("top").unwrap_or(&lower).trim();
        let n: usize = digits
            .parse()
            .map_err(|_| format!("unknown ranking size: {:?}", s))?;
        let candidate = TopN::Limit(n);
        if TopN::CHOICES.contains(&candidate) {
            Ok(candidate)
        } else {
            Err(format!("ranking size must be 5, 10, 20 or all (got {})", n))
        }
    }
}

/// Count per known category, in the order given. Unseen categories report 0.
pub fn category_counts(subset: &[&Ticket], categories: &[String]) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in subset {
        if let Some(service) = t.service.as_deref() {
            *counts.entry(service).or_insert(0) += 1;
        }
    }
    categories
        .iter()
        .map(|c| CategoryCount {
            category: c.clone(),
            count: counts.get(c.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

/// Most frequent values of `field`, descending. Ties keep first-seen order.
/// Tickets without a value are skipped.
pub fn top_n(subset: &[&Ticket], field: Field, n: TopN) -> Vec<RankEntry> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ranking: Vec<RankEntry> = Vec::new();
    for t in subset {
        let Some(label) = t.label(field) else {
            continue;
        };
        match index.get(label) {
            Some(&i) => ranking[i].count += 1,
            None => {
                index.insert(label, ranking.len());
                ranking.push(RankEntry {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }
    // sort_by is stable
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    if let TopN::Limit(limit) = n {
        ranking.truncate(limit);
    }
    ranking
}

/// Ticket counts per time bucket.
///
/// - `Day`: one entry per calendar day with tickets, chronological.
/// - `DayOfMonth`: one entry per day number with tickets, ascending.
/// - `Month`: tickets outside `months_filter` are dropped, then every selected
///   month is listed in calendar order, zero counts included.
pub fn time_bucket(
    subset: &[&Ticket],
    granularity: Granularity,
    months_filter: Option<&[u32]>,
) -> Vec<BucketCount> {
    let dates = subset.iter().filter_map(|t| t.created_at);
    match granularity {
        Granularity::Day => {
            let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
            for at in dates {
                *per_day.entry(at.date()).or_insert(0) += 1;
            }
            per_day
                .into_iter()
                .map(|(day, count)| BucketCount {
                    bucket: day.format("%Y-%m-%d").to_string(),
                    count,
                })
                .collect()
        }
        Granularity::DayOfMonth => {
            let mut per_day: BTreeMap<u32, usize> = BTreeMap::new();
            for at in dates {
                *per_day.entry(at.day()).or_insert(0) += 1;
            }
            per_day
                .into_iter()
                .map(|(day, count)| BucketCount {
                    bucket: day.to_string(),
                    count,
                })
                .collect()
        }
        Granularity::Month => {
            let selected: Vec<u32> = match months_filter {
                Some(months) => {
                    let mut m = months.to_vec();
                    m.sort_unstable();
                    m.dedup();
                    m
                }
                None => (1..=12).collect(),
            };
            let mut per_month: HashMap<u32, usize> = HashMap::new();
            for at in dates.filter(|at| selected.contains(&at.month())) {
                *per_month.entry(at.month()).or_insert(0) += 1;
            }
            selected
                .iter()
                .map(|m| BucketCount {
                    bucket: month_name(*m).to_string(),
                    count: per_month.get(m).copied().unwrap_or(0),
                })
                .collect()
        }
    }
}
