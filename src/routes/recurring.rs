// routes/recurring.rs
// GET/POST   /api/v1/fixed-schedules[, /{id}/pause|/resume, DELETE /{id}]
// GET/POST   /api/v1/subscriptions[, /{id}/pause|/resume, DELETE /{id}]

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::{AppError, AppResult};
use crate::models::{BillingCycle, FixedSchedule, FlowType, Subscription};
use crate::money;
use crate::state::{self, AppState, NewFixedSchedule, NewSubscription};
use crate::validation;

#[derive(Deserialize)]
pub struct CreateFixedScheduleRequest {
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub flow_type: FlowType,
    pub category_id: Option<Uuid>,
    pub day_of_month: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

pub async fn create_fixed_schedule(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateFixedScheduleRequest>,
) -> AppResult<(StatusCode, Json<FixedSchedule>)> {
    if !money::is_valid_amount(body.amount) {
        return Err(AppError::Schema("amount must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let name = validation::validate_name(&body.name)?;
    let currency = validation::validate_currency(&body.currency)?;
    validation::validate_day_of_month(body.day_of_month)?;
    let row = state::create_fixed_schedule(
        &state,
        &rc.ctx,
        NewFixedSchedule {
            name,
            amount: body.amount,
            currency,
            flow_type: body.flow_type,
            category_id: body.category_id,
            day_of_month: body.day_of_month,
            start_date: body.start_date,
            end_date: body.end_date,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_fixed_schedules(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
) -> AppResult<Json<Vec<FixedSchedule>>> {
    Ok(Json(state::list_fixed_schedules(&state, &rc.ctx).await?))
}

pub async fn pause_fixed_schedule(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<FixedSchedule>> {
    Ok(Json(state::pause_fixed_schedule(&state, &rc.ctx, id).await?))
}

pub async fn resume_fixed_schedule(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<FixedSchedule>> {
    Ok(Json(state::resume_fixed_schedule(&state, &rc.ctx, id).await?))
}

pub async fn delete_fixed_schedule(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_fixed_schedule(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub next_renewal_date: NaiveDate,
    #[serde(default)]
    pub auto_renew: bool,
    pub provider: String,
    pub credit_card_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    if !money::is_valid_amount(body.amount) {
        return Err(AppError::Schema("amount must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let name = validation::validate_name(&body.name)?;
    let currency = validation::validate_currency(&body.currency)?;
    let row = state::create_subscription(
        &state,
        &rc.ctx,
        NewSubscription {
            name,
            amount: body.amount,
            currency,
            billing_cycle: body.billing_cycle,
            next_renewal_date: body.next_renewal_date,
            auto_renew: body.auto_renew,
            provider: body.provider,
            credit_card_id: body.credit_card_id,
            category_id: body.category_id,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
) -> AppResult<Json<Vec<Subscription>>> {
    Ok(Json(state::list_subscriptions(&state, &rc.ctx).await?))
}

pub async fn pause_subscription(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Subscription>> {
    Ok(Json(state::pause_subscription(&state, &rc.ctx, id).await?))
}

pub async fn resume_subscription(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Subscription>> {
    Ok(Json(state::resume_subscription(&state, &rc.ctx, id).await?))
}

pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_subscription(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
