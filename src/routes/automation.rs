// routes/automation.rs
// POST /api/v1/automation/process-recurring?date=YYYY-MM-DD&preview=true -> 200 ProcessRecurringResult

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use serde::Deserialize;

use crate::auth::RequestContext;
use crate::automation::{self, ProcessRecurringResult};
use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProcessRecurringQuery {
    pub date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub preview: bool,
}

pub async fn process_recurring(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<ProcessRecurringQuery>,
) -> AppResult<Json<ProcessRecurringResult>> {
    let reference_date = query.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let result = automation::process_recurring(&state, &rc.ctx, reference_date, query.preview).await?;
    Ok(Json(result))
}
