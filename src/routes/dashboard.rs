// routes/dashboard.rs
// GET /api/v1/dashboard/summary              -> 200 DashboardSummary
// GET /api/v1/dashboard/series?period=weekly|monthly|quarterly -> 200 [PeriodPoint]
// GET /api/v1/dashboard/categories           -> 200 CategoryBreakdown
// GET /api/v1/dashboard/upcoming?days=30     -> 200 [UpcomingPayment]
// GET /api/v1/dashboard/health               -> 200 FinancialHealth

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use serde::Deserialize;

use crate::auth::RequestContext;
use crate::dashboard;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
) -> AppResult<Json<dashboard::DashboardSummary>> {
    Ok(Json(dashboard::summary(&state, &rc.ctx, today()).await?))
}

#[derive(Deserialize)]
pub struct SeriesQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "monthly".to_string()
}

pub async fn series(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<Vec<dashboard::PeriodPoint>>> {
    let points = match query.period.as_str() {
        "weekly" => dashboard::weekly_series(&state, &rc.ctx, today()).await?,
        "quarterly" => dashboard::quarterly_series(&state, &rc.ctx, today()).await?,
        "monthly" => dashboard::monthly_series(&state, &rc.ctx, today()).await?,
        other => return Err(AppError::Schema(format!("unknown period '{other}'"))),
    };
    Ok(Json(points))
}

pub async fn categories(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
) -> AppResult<Json<dashboard::CategoryBreakdown>> {
    Ok(Json(dashboard::category_breakdown(&state, &rc.ctx, today()).await?))
}

#[derive(Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

pub async fn upcoming(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<UpcomingQuery>,
) -> AppResult<Json<Vec<dashboard::UpcomingPayment>>> {
    Ok(Json(dashboard::upcoming_payments(&state, &rc.ctx, today(), query.days).await?))
}

pub async fn health(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
) -> AppResult<Json<dashboard::FinancialHealth>> {
    Ok(Json(dashboard::financial_health(&state, &rc.ctx, today()).await?))
}
