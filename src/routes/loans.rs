// routes/loans.rs
// GET    /api/v1/loans                  -> 200 [Loan]
// POST   /api/v1/loans                  -> 201 Loan
// PATCH  /api/v1/loans/{id}              -> 200 Loan
// DELETE /api/v1/loans/{id}              -> 204
// POST   /api/v1/loans/{id}/payments     -> 200 Loan
// POST   /api/v1/loans/{id}/payments/reverse -> 200 Loan

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::amortization::{LoanParams, validate_loan_params};
use crate::auth::RequestContext;
use crate::coordinators::loan as loan_coordinator;
use crate::errors::{AppError, AppResult};
use crate::models::{Loan, LoanStatus};
use crate::money;
use crate::state::{self, AppState, NewLoan};
use crate::validation;

#[derive(Deserialize)]
pub struct CreateLoanRequest {
    pub name: String,
    pub original_amount: Decimal,
    pub monthly_payment: Decimal,
    pub interest_rate: Decimal,
    pub total_payments: u32,
    pub start_date: NaiveDate,
    pub day_of_month: u32,
    pub category_id: Option<Uuid>,
    pub currency: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    if !money::is_valid_amount(body.original_amount) || !money::is_valid_amount(body.monthly_payment) {
        return Err(AppError::Schema("original_amount and monthly_payment must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let name = validation::validate_name(&body.name)?;
    let currency = validation::validate_currency(&body.currency)?;
    validation::validate_day_of_month(body.day_of_month)?;

    validate_loan_params(&LoanParams {
        original_amount: body.original_amount,
        monthly_payment: body.monthly_payment,
        interest_rate_annual_pct: body.interest_rate,
        total_payments: body.total_payments,
        start_date: body.start_date,
        day_of_month: body.day_of_month,
        payments_made: 0,
    })?;

    let row = state::create_loan(
        &state,
        &rc.ctx,
        NewLoan {
            name,
            original_amount: body.original_amount,
            monthly_payment: body.monthly_payment,
            interest_rate: body.interest_rate,
            total_payments: body.total_payments,
            start_date: body.start_date,
            day_of_month: body.day_of_month,
            category_id: body.category_id,
            currency,
            original_amount_fx: None,
            original_currency: None,
            exchange_rate: None,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list(State(state): State<Arc<AppState>>, rc: RequestContext) -> AppResult<Json<Vec<Loan>>> {
    Ok(Json(state::list_loans(&state, &rc.ctx).await?))
}

#[derive(Deserialize, Default)]
pub struct UpdateLoanRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<LoanStatus>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLoanRequest>,
) -> AppResult<Json<Loan>> {
    let name = body.name.map(|n| validation::validate_name(&n)).transpose()?;
    let row = state::update_loan(&state, &rc.ctx, id, name, body.category_id, body.status).await?;
    Ok(Json(row))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_loan(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
}

pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<RecordPaymentRequest>,
) -> AppResult<Json<Loan>> {
    if !money::is_valid_amount(body.amount) {
        return Err(AppError::Schema("amount must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let loan = loan_coordinator::record_payment(&state, &rc.ctx, id, body.amount).await?;
    Ok(Json(loan))
}

pub async fn reverse_payment(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Loan>> {
    let loan = loan_coordinator::reverse_payment(&state, &rc.ctx, id).await?;
    Ok(Json(loan))
}
