// routes/transactions.rs
// GET    /api/v1/transactions                 -> 200 Page<Transaction>
// POST   /api/v1/transactions                 -> 201 Transaction
// PATCH  /api/v1/transactions/{id}             -> 200 Transaction
// DELETE /api/v1/transactions/{id}             -> 204
// POST   /api/v1/transactions/bulk             -> 201 [Transaction]
// POST   /api/v1/transactions/bulk-delete      -> 200 { deleted: u64 }

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::{AppError, AppResult};
use crate::models::{EntryPattern, FlowType, Transaction};
use crate::money;
use crate::pagination::{Page, PageParams, paginate};
use crate::state::{self, AppState, NewTransaction, TransactionFilter};
use crate::validation;

const SORT_FIELDS: &[&str] = &["date", "amount", "created_at"];

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: Decimal,
    pub currency: String,
    pub flow_type: FlowType,
    pub category_id: Option<Uuid>,
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub entry_pattern: Option<EntryPattern>,
}

fn to_new_transaction(ctx_currency_checked: String, body: CreateTransactionRequest) -> AppResult<NewTransaction> {
    Ok(NewTransaction {
        amount: body.amount,
        currency: ctx_currency_checked,
        flow_type: body.flow_type,
        category_id: body.category_id,
        description: validation::validate_name(&body.description)?,
        date: body.date,
        entry_pattern: body.entry_pattern.unwrap_or(EntryPattern::OneTime),
        is_recurring: false,
        recurring_source_id: None,
        installment_id: None,
        installment_number: None,
        loan_id: None,
        credit_card_id: None,
        bank_account_id: None,
        original_amount: None,
        original_currency: None,
        exchange_rate: None,
    })
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    if !money::is_valid_amount(body.amount) {
        return Err(AppError::Schema("amount must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let currency = validation::validate_currency(&body.currency)?;
    let new = to_new_transaction(currency, body)?;
    let tx = state::create_transaction(&state, &rc.ctx, new).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

#[derive(Deserialize)]
pub struct ListTransactionsQuery {
    #[serde(flatten)]
    pub page: PageParams,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub flow_type: Option<FlowType>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Query(query): Query<ListTransactionsQuery>,
) -> AppResult<Json<Page<Transaction>>> {
    let _ = query.page.sort_field(SORT_FIELDS);
    let filter = TransactionFilter {
        from_date: query.from_date,
        to_date: query.to_date,
        category_id: query.category_id,
        flow_type: query.flow_type,
    };
    let rows = state::list_transactions(&state, &rc.ctx, &filter).await?;
    Ok(Json(paginate(rows, &query.page)))
}

#[derive(Deserialize, Default)]
pub struct UpdateTransactionRequest {
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTransactionRequest>,
) -> AppResult<Json<Transaction>> {
    if let Some(amount) = body.amount {
        if !money::is_valid_amount(amount) {
            return Err(AppError::Schema("amount must be positive with at most 2 decimal places and 13 integer digits".into()));
        }
    }
    let description = body.description.map(|d| validation::validate_name(&d)).transpose()?;
    let tx = state::update_transaction(&state, &rc.ctx, id, body.amount, body.category_id, description, body.date).await?;
    Ok(Json(tx))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_transaction(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct BulkCreateRequest {
    pub transactions: Vec<CreateTransactionRequest>,
}

pub async fn bulk_create(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<BulkCreateRequest>,
) -> AppResult<(StatusCode, Json<Vec<Transaction>>)> {
    let mut news = Vec::with_capacity(body.transactions.len());
    for req in body.transactions {
        if !money::is_valid_amount(req.amount) {
            return Err(AppError::Schema("amount must be positive with at most 2 decimal places and 13 integer digits".into()));
        }
        let currency = validation::validate_currency(&req.currency)?;
        news.push(to_new_transaction(currency, req)?);
    }
    let rows = state::bulk_create_transactions(&state, &rc.ctx, news).await?;
    Ok((StatusCode::CREATED, Json(rows)))
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

pub async fn bulk_delete(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResponse>> {
    let deleted = state::bulk_delete_transactions(&state, &rc.ctx, &body.ids).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}
