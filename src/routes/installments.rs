// routes/installments.rs
// GET    /api/v1/installments                 -> 200 [Installment]
// POST   /api/v1/installments                 -> 201 Installment
// DELETE /api/v1/installments/{id}             -> 204
// POST   /api/v1/installments/{id}/payments    -> 200 Installment
// POST   /api/v1/installments/{id}/payments/reverse -> 200 Installment

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::coordinators::installment as installment_coordinator;
use crate::errors::{AppError, AppResult};
use crate::models::{FlowType, Installment};
use crate::money;
use crate::state::{self, AppState, NewInstallment};
use crate::validation;

#[derive(Deserialize)]
pub struct CreateInstallmentRequest {
    pub name: String,
    pub total_amount: Decimal,
    pub monthly_amount: Decimal,
    pub number_of_payments: u32,
    pub flow_type: FlowType,
    pub category_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub day_of_month: u32,
    pub currency: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateInstallmentRequest>,
) -> AppResult<(StatusCode, Json<Installment>)> {
    if !money::is_valid_amount(body.total_amount) || !money::is_valid_amount(body.monthly_amount) {
        return Err(AppError::Schema("total_amount and monthly_amount must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let name = validation::validate_name(&body.name)?;
    let currency = validation::validate_currency(&body.currency)?;
    validation::validate_day_of_month(body.day_of_month)?;

    let row = state::create_installment(
        &state,
        &rc.ctx,
        NewInstallment {
            name,
            total_amount: body.total_amount,
            monthly_amount: body.monthly_amount,
            number_of_payments: body.number_of_payments,
            flow_type: body.flow_type,
            category_id: body.category_id,
            start_date: body.start_date,
            day_of_month: body.day_of_month,
            currency,
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list(State(state): State<Arc<AppState>>, rc: RequestContext) -> AppResult<Json<Vec<Installment>>> {
    Ok(Json(state::list_installments(&state, &rc.ctx).await?))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_installment(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_paid(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Installment>> {
    Ok(Json(installment_coordinator::mark_paid(&state, &rc.ctx, id).await?))
}

pub async fn reverse_payment(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Installment>> {
    Ok(Json(installment_coordinator::reverse_payment(&state, &rc.ctx, id).await?))
}
