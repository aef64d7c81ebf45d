//! Resolution-time statistics for the summary cards.
use serde::Serialize;

use crate::parser::types::Ticket;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    /// Tickets having both dates, finish not before creation.
    pub echantillon: usize,
    pub moyenne_jours: f64,
    pub mediane_jours: f64,
    pub p90_jours: f64,
}

/// Arithmetic mean. Returns 0.0 if the slice is empty.
pub fn moyenne(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile with linear interpolation. `p` is in [0, 100].
/// Returns 0.0 if the slice is empty.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// `finish_at - created_at` in fractional days over the subset.
/// None when no ticket in the subset has been finished.
pub fn resolution_stats(subset: &[&Ticket]) -> Option<ResolutionStats> {
    let durations: Vec<f64> = subset
        .iter()
        .filter_map(|t| match (t.created_at, t.finish_at) {
            (Some(created), Some(finished)) if finished >= created => {
                Some((finished - created).num_minutes() as f64 / 1440.0)
            }
            _ => None,
        })
        .collect();

    if durations.is_empty() {
        return None;
    }

    Some(ResolutionStats {
        echantillon: durations.len(),
        moyenne_jours: round2(moyenne(&durations)),
        mediane_jours: round2(percentile(&durations, 50.0)),
        p90_jours: round2(percentile(&durations, 90.0)),
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
