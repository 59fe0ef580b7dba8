use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{EntryPattern, FlowType, Transaction};
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewTransaction {
    pub amount: Decimal,
    pub currency: String,
    pub flow_type: FlowType,
    pub category_id: Option<Id>,
    pub description: String,
    pub date: chrono::NaiveDate,
    pub entry_pattern: EntryPattern,
    pub is_recurring: bool,
    pub recurring_source_id: Option<Id>,
    pub installment_id: Option<Id>,
    pub installment_number: Option<i32>,
    pub loan_id: Option<Id>,
    pub credit_card_id: Option<Id>,
    pub bank_account_id: Option<Id>,
    pub original_amount: Option<Decimal>,
    pub original_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
}

pub async fn create_transaction(
    state: &AppState,
    ctx: &DataContext,
    new: NewTransaction,
) -> AppResult<Transaction> {
    let tx = Transaction {
        id: new_id(),
        owner: ctx.stamp(),
        amount: new.amount,
        currency: new.currency,
        flow_type: new.flow_type,
        category_id: new.category_id,
        description: new.description,
        date: new.date,
        entry_pattern: new.entry_pattern,
        is_recurring: new.is_recurring,
        recurring_source_id: new.recurring_source_id,
        installment_id: new.installment_id,
        installment_number: new.installment_number,
        loan_id: new.loan_id,
        credit_card_id: new.credit_card_id,
        bank_account_id: new.bank_account_id,
        original_amount: new.original_amount,
        original_currency: new.original_currency,
        exchange_rate: new.exchange_rate,
        created_at: chrono::Utc::now(),
    };
    state
        .transactions
        .insert_one(&tx)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(tx)
}

pub async fn get_transaction(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Transaction> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .transactions
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("transaction not found"))
}

#[derive(Default)]
pub struct TransactionFilter {
    pub from_date: Option<chrono::NaiveDate>,
    pub to_date: Option<chrono::NaiveDate>,
    pub category_id: Option<Id>,
    pub flow_type: Option<FlowType>,
}

pub async fn list_transactions(
    state: &AppState,
    ctx: &DataContext,
    f: &TransactionFilter,
) -> AppResult<Vec<Transaction>> {
    let mut filter = ctx.ownership_filter();
    if f.from_date.is_some() || f.to_date.is_some() {
        let mut range = bson::Document::new();
        if let Some(from) = f.from_date {
            range.insert("$gte", bson::to_bson(&from).unwrap());
        }
        if let Some(to) = f.to_date {
            range.insert("$lte", bson::to_bson(&to).unwrap());
        }
        filter.insert("date", range);
    }
    if let Some(cat) = f.category_id {
        filter.insert("category_id", cat);
    }
    if let Some(ft) = f.flow_type {
        filter.insert("type", bson::to_bson(&ft).unwrap());
    }

    let mut cursor = state
        .transactions
        .find(filter)
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(t) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(t);
    }
    out.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    Ok(out)
}

pub async fn update_transaction(
    state: &AppState,
    ctx: &DataContext,
    id: Id,
    amount: Option<Decimal>,
    category_id: Option<Option<Id>>,
    description: Option<String>,
    date: Option<chrono::NaiveDate>,
) -> AppResult<Transaction> {
    let _ = get_transaction(state, ctx, id).await?;
    let mut set = bson::Document::new();
    if let Some(a) = amount {
        set.insert("amount", bson::to_bson(&a).unwrap());
    }
    if let Some(cat) = category_id {
        set.insert("category_id", cat.map(bson::Bson::from).unwrap_or(bson::Bson::Null));
    }
    if let Some(d) = description {
        set.insert("description", d);
    }
    if let Some(dt) = date {
        set.insert("date", bson::to_bson(&dt).unwrap());
    }
    if set.is_empty() {
        return get_transaction(state, ctx, id).await;
    }

    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .transactions
        .update_one(filter, doc! { "$set": set })
        .await
        .map_err(anyhow::Error::from)?;
    get_transaction(state, ctx, id).await
}

pub async fn delete_transaction(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .transactions
        .delete_one(filter)
        .await
        .map_err(anyhow::Error::from)?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("transaction not found"));
    }
    Ok(())
}

/// Bulk insert. Capped at 500 rows per request (resolved Open Question,
/// SPEC_FULL.md §B) — the caller is responsible for writing one audit
/// entry per affected row.
pub async fn bulk_create_transactions(
    state: &AppState,
    ctx: &DataContext,
    news: Vec<NewTransaction>,
) -> AppResult<Vec<Transaction>> {
    if news.len() > 500 {
        return Err(AppError::invariant("bulk operations are capped at 500 rows"));
    }
    let rows: Vec<Transaction> = news
        .into_iter()
        .map(|new| Transaction {
            id: new_id(),
            owner: ctx.stamp(),
            amount: new.amount,
            currency: new.currency,
            flow_type: new.flow_type,
            category_id: new.category_id,
            description: new.description,
            date: new.date,
            entry_pattern: new.entry_pattern,
            is_recurring: new.is_recurring,
            recurring_source_id: new.recurring_source_id,
            installment_id: new.installment_id,
            installment_number: new.installment_number,
            loan_id: new.loan_id,
            credit_card_id: new.credit_card_id,
            bank_account_id: new.bank_account_id,
            original_amount: new.original_amount,
            original_currency: new.original_currency,
            exchange_rate: new.exchange_rate,
            created_at: chrono::Utc::now(),
        })
        .collect();
    if !rows.is_empty() {
        state
            .transactions
            .insert_many(&rows)
            .await
            .map_err(anyhow::Error::from)?;
    }
    Ok(rows)
}

pub async fn bulk_delete_transactions(
    state: &AppState,
    ctx: &DataContext,
    ids: &[Id],
) -> AppResult<u64> {
    if ids.len() > 500 {
        return Err(AppError::invariant("bulk operations are capped at 500 rows"));
    }
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", doc! { "$in": ids });
    let result = state
        .transactions
        .delete_many(filter)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(result.deleted_count)
}
