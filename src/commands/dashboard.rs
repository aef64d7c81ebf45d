use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzer::aggregate::TopN;
use crate::analyzer::dashboard::{build_dashboard, DashboardRequest, DashboardView};
use crate::analyzer::filter::{
    available_months, available_years, date_bounds, service_options, CategoryFilter,
};
use crate::analyzer::temporal::FilterMode;
use crate::config::get_config_from_db;
use crate::db::queries;
use crate::error::AppError;
use crate::parser::types::Dataset;
use crate::state::{AppState, DbAccess};

/// What the operator asked for; unset values fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct DashboardQuery {
    pub service: Option<String>,
    /// None = daily range over the whole dataset.
    pub mode: Option<FilterMode>,
    pub top: Option<TopN>,
    pub tag: Option<String>,
    pub company: Option<String>,
}

/// Choices the dataset offers to the filter widgets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOfferings {
    pub services: Vec<String>,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub years: Vec<YearMonths>,
    pub top_choices: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearMonths {
    pub year: i32,
    pub months: Vec<u32>,
}

fn active_dataset(state: &AppState) -> Result<Dataset, AppError> {
    state
        .db(|conn| Ok(queries::load_active_dataset(conn)?))?
        .ok_or(AppError::NoSnapshot)
}

/// Daily range over the dataset span; a snapshot without any parsed date
/// falls back to today, which yields empty panels.
fn default_mode(dataset: &Dataset) -> FilterMode {
    let (lo, hi) = date_bounds(dataset).unwrap_or_else(|| {
        let today = chrono::Local::now().date_naive();
        (today, today)
    });
    FilterMode::Daily {
        start: Some(lo),
        end: Some(hi),
    }
}

/// One render pass: load snapshot and remembered picks, build the view,
/// write the reconciled picks back. Nothing is written if the pass fails.
pub fn run_dashboard_logic(
    state: &AppState,
    query: &DashboardQuery,
) -> Result<DashboardView, AppError> {
    let dataset = active_dataset(state)?;
    let config = state.db(|conn| Ok(get_config_from_db(conn)?))?;
    let mut selection = state.db(|conn| Ok(queries::load_selection(conn)?))?;

    let request = DashboardRequest {
        category: query
            .service
            .as_deref()
            .map(CategoryFilter::parse)
            .unwrap_or(CategoryFilter::All),
        mode: query.mode.clone().unwrap_or_else(|| default_mode(&dataset)),
        top: query.top.unwrap_or(config.default_top_n),
        tag: query.tag.clone(),
        company: query.company.clone(),
    };

    let view = build_dashboard(&dataset, &request, &config.categories, &mut selection)?;

    state.db_mut(|conn| Ok(queries::save_selection(conn, &selection)?))?;
    log::info!(
        "Dashboard {} / {}: {} tickets in {} ms",
        view.meta.category,
        view.meta.top,
        view.meta.total_tickets,
        view.meta.calcul_duration_ms
    );
    Ok(view)
}

pub fn get_offerings(state: &AppState) -> Result<DatasetOfferings, AppError> {
    let dataset = active_dataset(state)?;
    let bounds = date_bounds(&dataset);
    Ok(DatasetOfferings {
        services: service_options(&dataset),
        date_min: bounds.map(|(lo, _)| lo),
        date_max: bounds.map(|(_, hi)| hi),
        years: available_years(&dataset)
            .into_iter()
            .map(|year| YearMonths {
                year,
                months: available_months(&dataset, year),
            })
            .collect(),
        top_choices: TopN::CHOICES.iter().map(|t| t.to_string()).collect(),
    })
}

pub fn clear_selection(state: &AppState) -> Result<(), AppError> {
    state.db_mut(|conn| {
        let mut selection = queries::load_selection(conn)?;
        selection.clear();
        Ok(queries::save_selection(conn, &selection)?)
    })
}
