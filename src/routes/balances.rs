// routes/balances.rs
// POST /api/v1/bank-balances        -> 201 BankBalance (flips prior current row)
// GET  /api/v1/bank-balances        -> 200 [BankBalance]
// PUT  /api/v1/expected-income      -> 200 ExpectedIncome (upsert per month)
// GET  /api/v1/expected-income      -> 200 [ExpectedIncome]
// DELETE /api/v1/expected-income/{id} -> 204

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::AppError;
use crate::errors::AppResult;
use crate::models::{BankBalance, ExpectedIncome};
use crate::state::{self, AppState};
use crate::validation;

#[derive(Deserialize)]
pub struct RecordBalanceRequest {
    pub balance: Decimal,
    pub currency: String,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
    pub bank_account_id: Option<Uuid>,
}

pub async fn record_balance(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<RecordBalanceRequest>,
) -> AppResult<(StatusCode, Json<BankBalance>)> {
    let currency = validation::validate_currency(&body.currency)?;
    let row = state::record_balance(&state, &rc.ctx, body.balance, &currency, body.effective_date, body.notes, body.bank_account_id)
        .await
        .map_err(AppError::Dependency)?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_balances(State(state): State<Arc<AppState>>, rc: RequestContext) -> AppResult<Json<Vec<BankBalance>>> {
    Ok(Json(state::list_balances(&state, &rc.ctx).await.map_err(AppError::Dependency)?))
}

#[derive(Deserialize)]
pub struct SetExpectedIncomeRequest {
    pub month: NaiveDate,
    pub expected_amount: Decimal,
    pub notes: Option<String>,
}

pub async fn set_expected_income(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<SetExpectedIncomeRequest>,
) -> AppResult<Json<ExpectedIncome>> {
    let row = state::set_expected_income(&state, &rc.ctx, body.month, body.expected_amount, body.notes).await?;
    Ok(Json(row))
}

pub async fn list_expected_incomes(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
) -> AppResult<Json<Vec<ExpectedIncome>>> {
    Ok(Json(state::list_expected_incomes(&state, &rc.ctx).await?))
}

pub async fn delete_expected_income(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_expected_income(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
