// routes/alerts.rs
// POST /api/v1/alerts/generate               -> 200 [Alert] (regenerates in place)
// GET  /api/v1/alerts?include_dismissed=false -> 200 [Alert]
// POST /api/v1/alerts/{id}/read               -> 200 Alert
// POST /api/v1/alerts/{id}/dismiss            -> 200 Alert

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::alerts;
use crate::auth::RequestContext;
use crate::errors::AppResult;
use crate::models::Alert;
use crate::state::{self, AppState};

const FORECAST_HORIZON_MONTHS: u32 = 3;

pub async fn generate(State(state): State<Arc<AppState>>, rc: RequestContext) -> AppResult<Json<Vec<Alert>>> {
    let today = chrono::Utc::now().date_naive();
    let rows = alerts::generate_alerts(&state, &rc.ctx, today, FORECAST_HORIZON_MONTHS).await?;
    Ok(Json(rows))
}

#[derive(Deserialize, Default)]
pub struct ListAlertsQuery {
    #[serde(default)]
    pub include_dismissed: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<ListAlertsQuery>,
) -> AppResult<Json<Vec<Alert>>> {
    Ok(Json(state::list_alerts(&state, &rc.ctx, query.include_dismissed).await?))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Alert>> {
    Ok(Json(state::mark_alert_read(&state, &rc.ctx, id).await?))
}

pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Alert>> {
    Ok(Json(state::dismiss_alert(&state, &rc.ctx, id).await?))
}
