//! Dashboard render pass: resolves the period, filters, aggregates and
//! reconciles the remembered picks into one serialisable view.
use std::fmt;
use std::time::Instant;

use serde::Serialize;

use super::aggregate::{
    category_counts, time_bucket, top_n, BucketCount, CategoryCount, RankEntry, TopN,
};
use super::filter::{
    available_months, available_years, filter_tickets, with_label, CategoryFilter,
};
use super::selection::{SelectionState, SELECTED_COMPANY, SELECTED_TAG};
use super::stats::{resolution_stats, ResolutionStats};
use super::temporal::{resolve, DateInterval, FilterMode, Granularity};
use crate::error::AppError;
use crate::parser::types::{Dataset, Field, Ticket};

/// Cap used by the per-category rankings.
const PER_CATEGORY_TOP: TopN = TopN::Limit(5);

// ─── Data Structures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DashboardRequest {
    pub category: CategoryFilter,
    pub mode: FilterMode,
    pub top: TopN,
    /// Explicit picks; they replace the remembered value before reconciliation.
    pub tag: Option<String>,
    pub company: Option<String>,
}

/// Why a panel has nothing to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason", content = "column")]
pub enum NoDataReason {
    EmptyResult,
    MissingField(String),
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::EmptyResult => write!(f, "No data for this selection"),
            NoDataReason::MissingField(column) => {
                write!(f, "Column '{}' not found in the sheet", column)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "content")]
pub enum Panel<T> {
    Data(T),
    NoData(NoDataReason),
}

impl<T> Panel<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Panel::Data(d) => Some(d),
            Panel::NoData(_) => None,
        }
    }

    fn missing(field: Field) -> Self {
        Panel::NoData(NoDataReason::MissingField(field.column().to_string()))
    }

    fn empty() -> Self {
        Panel::NoData(NoDataReason::EmptyResult)
    }
}

impl<T> Panel<Vec<T>> {
    fn non_empty(items: Vec<T>) -> Self {
        if items.is_empty() {
            Panel::empty()
        } else {
            Panel::Data(items)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub meta: DashboardMeta,
    pub summary: Panel<Vec<CategoryCount>>,
    pub resolution: Panel<ResolutionStats>,
    /// Only filled when every category is shown.
    pub top_tags_by_category: Option<Vec<CategoryRanking>>,
    pub top_companies_by_category: Option<Vec<CategoryRanking>>,
    pub tag_ranking: Panel<Vec<RankEntry>>,
    pub company_ranking: Panel<Vec<RankEntry>>,
    pub timeline: Panel<Vec<BucketCount>>,
    pub tag_focus: Panel<FocusSeries>,
    pub company_focus: Panel<FocusSeries>,
    pub details: Panel<DetailTable>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    pub category: String,
    pub mode: FilterMode,
    pub granularity: Granularity,
    pub interval: DateInterval,
    pub top: String,
    pub total_tickets: usize,
    pub calcul_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRanking {
    pub category: String,
    pub ranking: Panel<Vec<RankEntry>>,
}

/// Time series of the ticket subset carrying the focused label.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSeries {
    pub value: String,
    pub total: usize,
    pub series: Vec<BucketCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailTable {
    pub extra_columns: Vec<String>,
    pub rows: Vec<Ticket>,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Monthly and yearly picks must name periods the dataset actually offers.
pub fn validate_against_dataset(dataset: &Dataset, mode: &FilterMode) -> Result<(), AppError> {
    let (year, months): (i32, Vec<u32>) = match mode {
        FilterMode::Daily { .. } => return Ok(()),
        FilterMode::Monthly { year, month } => (*year, vec![*month]),
        FilterMode::Yearly { year, months } => (*year, months.clone()),
    };

    if !available_years(dataset).contains(&year) {
        return Err(AppError::InvalidSelection(format!(
            "no ticket in {}",
            year
        )));
    }
    let offered = available_months(dataset, year);
    let absent: Vec<String> = months
        .iter()
        .filter(|m| !offered.contains(m))
        .map(|m| m.to_string())
        .collect();
    if !absent.is_empty() {
        return Err(AppError::InvalidSelection(format!(
            "months without tickets in {}: {}",
            year,
            absent.join(", ")
        )));
    }
    Ok(())
}

// ─── Render pass ─────────────────────────────────────────────────────────────

/// Builds the complete dashboard for `request`.
///
/// Only an invalid period selection fails the pass; empty subsets and absent
/// columns turn the affected panels into `Panel::NoData`.
pub fn build_dashboard(
    dataset: &Dataset,
    request: &DashboardRequest,
    categories: &[String],
    selection: &mut SelectionState,
) -> Result<DashboardView, AppError> {
    let start = Instant::now();

    if !dataset.has(Field::CreatedDate) {
        return undated_view(request, categories, start);
    }

    validate_against_dataset(dataset, &request.mode)?;
    let interval = resolve(&request.mode)?;
    let granularity = request.mode.granularity();
    let months_filter = request.mode.months_filter();

    let subset = filter_tickets(&dataset.tickets, &interval, &request.category);
    log::debug!(
        "Filter {:?} {}: {} / {} tickets",
        request.category,
        interval.start,
        subset.len(),
        dataset.tickets.len()
    );

    let has_services = dataset.has(Field::Services);
    let show_all = request.category == CategoryFilter::All;

    // Summary cards
    let summary = if !has_services {
        Panel::missing(Field::Services)
    } else {
        match &request.category {
            CategoryFilter::All => Panel::Data(category_counts(&subset, categories)),
            CategoryFilter::Only(service) => {
                Panel::Data(category_counts(&subset, std::slice::from_ref(service)))
            }
        }
    };

    let resolution = if !dataset.has(Field::FinishDate) {
        Panel::missing(Field::FinishDate)
    } else {
        resolution_stats(&subset).map_or_else(Panel::empty, Panel::Data)
    };

    let (top_tags_by_category, top_companies_by_category) = if show_all {
        (
            Some(per_category_rankings(dataset, &subset, categories, Field::Tags)),
            Some(per_category_rankings(dataset, &subset, categories, Field::Company)),
        )
    } else {
        (None, None)
    };

    // Rankings with the operator's cap, plus the full candidate lists
    let tag_candidates = ranking_labels(dataset, &subset, Field::Tags);
    let company_candidates = ranking_labels(dataset, &subset, Field::Company);
    let tag_ranking = ranking_panel(dataset, &subset, Field::Tags, request.top);
    let company_ranking = ranking_panel(dataset, &subset, Field::Company, request.top);

    let timeline = if subset.is_empty() {
        Panel::empty()
    } else {
        Panel::Data(time_bucket(&subset, granularity, months_filter.as_deref()))
    };

    if let Some(tag) = &request.tag {
        selection.pick(SELECTED_TAG, tag.as_str());
    }
    if let Some(company) = &request.company {
        selection.pick(SELECTED_COMPANY, company.as_str());
    }

    let focused_tag = tag_candidates
        .as_ref()
        .and_then(|c| selection.resolve(SELECTED_TAG, c));
    let focused_company = company_candidates
        .as_ref()
        .and_then(|c| selection.resolve(SELECTED_COMPANY, c));

    let tag_focus = focus_panel(
        &subset,
        Field::Tags,
        tag_candidates.is_some(),
        focused_tag.as_deref(),
        granularity,
        months_filter.as_deref(),
    );
    let company_focus = focus_panel(
        &subset,
        Field::Company,
        company_candidates.is_some(),
        focused_company.as_deref(),
        granularity,
        months_filter.as_deref(),
    );

    let details = detail_panel(dataset, &subset);

    Ok(DashboardView {
        meta: DashboardMeta {
            category: category_label(&request.category),
            mode: request.mode.clone(),
            granularity,
            interval,
            top: request.top.to_string(),
            total_tickets: subset.len(),
            calcul_duration_ms: start.elapsed().as_millis() as u64,
        },
        summary,
        resolution,
        top_tags_by_category,
        top_companies_by_category,
        tag_ranking,
        company_ranking,
        timeline,
        tag_focus,
        company_focus,
        details,
    })
}

fn category_label(category: &CategoryFilter) -> String {
    match category {
        CategoryFilter::All => super::filter::ALL_SERVICES.to_string(),
        CategoryFilter::Only(s) => s.clone(),
    }
}

/// Without a creation date column no ticket falls in any period. Every panel
/// reports the missing column and the remembered picks stay untouched.
fn undated_view(
    request: &DashboardRequest,
    categories: &[String],
    start: Instant,
) -> Result<DashboardView, AppError> {
    let interval = resolve(&request.mode)?;
    log::warn!("Column {} missing, dashboard left empty", Field::CreatedDate.column());

    let per_category = (request.category == CategoryFilter::All).then(|| {
        categories
            .iter()
            .map(|category| CategoryRanking {
                category: category.clone(),
                ranking: Panel::missing(Field::CreatedDate),
            })
            .collect::<Vec<_>>()
    });

    Ok(DashboardView {
        meta: DashboardMeta {
            category: category_label(&request.category),
            mode: request.mode.clone(),
            granularity: request.mode.granularity(),
            interval,
            top: request.top.to_string(),
            total_tickets: 0,
            calcul_duration_ms: start.elapsed().as_millis() as u64,
        },
        summary: Panel::missing(Field::CreatedDate),
        resolution: Panel::missing(Field::CreatedDate),
        top_tags_by_category: per_category.clone(),
        top_companies_by_category: per_category,
        tag_ranking: Panel::missing(Field::CreatedDate),
        company_ranking: Panel::missing(Field::CreatedDate),
        timeline: Panel::missing(Field::CreatedDate),
        tag_focus: Panel::missing(Field::CreatedDate),
        company_focus: Panel::missing(Field::CreatedDate),
        details: Panel::missing(Field::CreatedDate),
    })
}

fn per_category_rankings(
    dataset: &Dataset,
    subset: &[&Ticket],
    categories: &[String],
    field: Field,
) -> Vec<CategoryRanking> {
    categories
        .iter()
        .map(|category| {
            let ranking = if !dataset.has(Field::Services) {
                Panel::missing(Field::Services)
            } else {
                let in_category = with_label(subset, Field::Services, category);
                ranking_panel(dataset, &in_category, field, PER_CATEGORY_TOP)
            };
            CategoryRanking {
                category: category.clone(),
                ranking,
            }
        })
        .collect()
}

fn ranking_panel(
    dataset: &Dataset,
    subset: &[&Ticket],
    field: Field,
    n: TopN,
) -> Panel<Vec<RankEntry>> {
    if !dataset.has(field) {
        return Panel::missing(field);
    }
    Panel::non_empty(top_n(subset, field, n))
}

/// Every label of `field` by descending frequency; None when the column is absent.
fn ranking_labels(dataset: &Dataset, subset: &[&Ticket], field: Field) -> Option<Vec<String>> {
    if !dataset.has(field) {
        return None;
    }
    Some(
        top_n(subset, field, TopN::All)
            .into_iter()
            .map(|r| r.label)
            .collect(),
    )
}

fn focus_panel(
    subset: &[&Ticket],
    field: Field,
    field_present: bool,
    focused: Option<&str>,
    granularity: Granularity,
    months_filter: Option<&[u32]>,
) -> Panel<FocusSeries> {
    if !field_present {
        return Panel::missing(field);
    }
    let Some(value) = focused else {
        return Panel::empty();
    };
    let narrowed = with_label(subset, field, value);
    Panel::Data(FocusSeries {
        value: value.to_string(),
        total: narrowed.len(),
        series: time_bucket(&narrowed, granularity, months_filter),
    })
}

/// Every filtered row sorted by tag ascending; untagged rows last, input
/// order kept among equal tags.
fn detail_panel(dataset: &Dataset, subset: &[&Ticket]) -> Panel<DetailTable> {
    let mut rows: Vec<&Ticket> = subset.to_vec();
    if rows.is_empty() {
        return Panel::empty();
    }
    rows.sort_by(|a, b| match (&a.tags, &b.tags) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Panel::Data(DetailTable {
        extra_columns: dataset.extra_columns.clone(),
        rows: rows.into_iter().cloned().collect(),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
