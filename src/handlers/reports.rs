use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::revenue::{MonthlyReport, YearlyReport};
use crate::utils::time::year_month_of;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Monthly revenue; missing parameters default to the current month
pub async fn monthly_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<MonthlyReport>> {
    let (year, month) = year_month_of(state.clock.now(), state.config.timezone);
    let report = state
        .revenue
        .monthly(query.year.unwrap_or(year), query.month.unwrap_or(month))
        .await?;
    Ok(Json(report))
}

/// Yearly revenue; a missing year defaults to the current one
pub async fn yearly_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<YearlyReport>> {
    let (year, _) = year_month_of(state.clock.now(), state.config.timezone);
    Ok(Json(state.revenue.yearly(query.year.unwrap_or(year)).await?))
}
