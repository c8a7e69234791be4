//! Summary endpoints. Read-only.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use rebill_core::{DashboardSummary, PeriodProductSummary, QuickStats, SalesSummary, TopProduct};
use rebill_db::local_now;

use super::bills::{DateQuery, DateWindow};
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_TOP_LIMIT: usize = 10;
const MAX_TOP_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

impl TopQuery {
    /// Out-of-range limits fall back to the default.
    pub fn limit(self) -> usize {
        match self.limit {
            Some(n) if (1..=MAX_TOP_LIMIT).contains(&n) => n as usize,
            _ => DEFAULT_TOP_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WeekQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// `GET /summary/today`
pub async fn today(State(state): State<AppState>) -> ApiResult<Json<SalesSummary>> {
    Ok(Json(state.db.reports().todays_summary().await?))
}

/// `GET /summary?date=` or `GET /summary?start=&end=`; today without either.
pub async fn for_dates(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Json<SalesSummary>> {
    let Query(query) = query?;
    let reports = state.db.reports();

    let summary = match query.window()? {
        DateWindow::Day(date) => reports.summary_for_date(date).await?,
        DateWindow::Range(start, end) => reports.summary_between(start, end).await?,
        DateWindow::Unbounded => reports.todays_summary().await?,
    };
    Ok(Json(summary))
}

/// `GET /summary/dashboard`
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(state.db.reports().dashboard_summary().await?))
}

/// `GET /summary/top-products?limit=`
pub async fn top_products(
    State(state): State<AppState>,
    query: Result<Query<TopQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TopProduct>>> {
    let Query(query) = query?;
    Ok(Json(state.db.reports().top_selling_products(query.limit()).await?))
}

/// `GET /summary/weekly?date=`, the week containing `date` (default today).
pub async fn weekly(
    State(state): State<AppState>,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> ApiResult<Json<PeriodProductSummary>> {
    let Query(query) = query?;
    let date = query.date.unwrap_or_else(|| local_now().date());
    Ok(Json(state.db.reports().weekly_product_summary(date).await?))
}

/// `GET /summary/monthly?year=&month=` (default current month).
pub async fn monthly(
    State(state): State<AppState>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Json<PeriodProductSummary>> {
    let Query(query) = query?;
    let today = local_now().date();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());
    Ok(Json(state.db.reports().monthly_product_summary(year, month).await?))
}

/// `GET /summary/quick-stats`
pub async fn quick_stats(State(state): State<AppState>) -> ApiResult<Json<QuickStats>> {
    Ok(Json(state.db.reports().quick_stats().await?))
}
