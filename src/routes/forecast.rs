// routes/forecast.rs
// GET /api/v1/forecast/monthly?months=12 -> 200 MonthlyForecast
// GET /api/v1/forecast/weekly?weeks=8    -> 200 WeeklyForecast

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use serde::Deserialize;

use crate::auth::RequestContext;
use crate::errors::AppResult;
use crate::forecast::{self, MonthlyForecast, WeeklyForecast};
use crate::state::AppState;

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

#[derive(Deserialize)]
pub struct MonthlyQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

fn default_months() -> u32 {
    12
}

pub async fn monthly(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<MonthlyQuery>,
) -> AppResult<Json<MonthlyForecast>> {
    Ok(Json(
        forecast::compute_monthly_forecast(&state, &rc.ctx, today(), query.months).await?,
    ))
}

#[derive(Deserialize)]
pub struct WeeklyQuery {
    #[serde(default = "default_weeks")]
    pub weeks: u32,
}

fn default_weeks() -> u32 {
    8
}

pub async fn weekly(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<WeeklyQuery>,
) -> AppResult<Json<WeeklyForecast>> {
    Ok(Json(
        forecast::compute_weekly_forecast(&state, &rc.ctx, today(), query.weeks).await?,
    ))
}
