//! Recurring-charge materialisation (spec §4.G). Idempotent: re-running the
//! same `(entity, reference_date)` never creates a second transaction.
//!
//! "Row lock" is emulated with a compare-and-swap `update_one` keyed on the
//! counter's current value — the same pattern `state::installments`'
//! `record_installment_payment` already uses, generalised to cover the
//! combined counter+balance mutation loans need (spec §5: "acquire
//! exclusive locks on the entity row(s) they mutate").

use bson::doc;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::ids::Id;
use crate::models::{EntryPattern, FlowType, LoanStatus};
use crate::state::{self, AppState, NewTransaction};
use crate::tenancy::DataContext;

fn flow_type_str(flow_type: FlowType) -> &'static str {
    match flow_type {
        FlowType::Income => "income",
        FlowType::Expense => "expense",
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurringSource {
    Loan,
    Fixed,
    Installment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewTransaction {
    pub source: RecurringSource,
    pub amount: Decimal,
    pub currency: String,
    pub flow_type: FlowType,
    pub description: String,
    pub date: NaiveDate,
    pub category_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessRecurringResult {
    pub loans_charged: u32,
    pub fixed_charged: u32,
    pub installments_charged: u32,
    pub skipped: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_transactions: Option<Vec<PreviewTransaction>>,
}

async fn has_recurring_transaction(
    state: &AppState,
    ctx: &DataContext,
    field: &str,
    entity_id: Id,
    date: NaiveDate,
) -> AppResult<bool> {
    let mut filter = ctx.ownership_filter();
    filter.insert(field, entity_id);
    filter.insert("date", bson::to_bson(&date).unwrap());
    filter.insert("is_recurring", true);
    Ok(state
        .transactions
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .is_some())
}

async fn process_loans(
    state: &AppState,
    ctx: &DataContext,
    reference_date: NaiveDate,
    preview: bool,
    out: &mut ProcessRecurringResult,
    previews: &mut Vec<PreviewTransaction>,
) -> AppResult<()> {
    let candidates: Vec<_> = state::list_active_loans(state, ctx)
        .await?
        .into_iter()
        .filter(|loan| loan.day_of_month == reference_date.day())
        .collect();

    for loan in candidates {
        if loan.payments_made >= loan.total_payments {
            out.skipped += 1;
            continue;
        }
        if has_recurring_transaction(state, ctx, "loan_id", loan.id, reference_date).await? {
            out.skipped += 1;
            continue;
        }

        if preview {
            previews.push(PreviewTransaction {
                source: RecurringSource::Loan,
                amount: loan.monthly_payment,
                currency: loan.currency.clone(),
                flow_type: FlowType::Expense,
                description: format!("Loan payment: {}", loan.name),
                date: reference_date,
                category_id: loan.category_id,
            });
            out.loans_charged += 1;
            continue;
        }

        let new_payments_made = loan.payments_made + 1;
        let new_remaining = (loan.remaining_balance - loan.monthly_payment).max(Decimal::ZERO);
        let terminal = new_payments_made >= loan.total_payments;

        let mut filter = ctx.ownership_filter();
        filter.insert("_id", loan.id);
        filter.insert("payments_made", bson::to_bson(&loan.payments_made).unwrap());

        let mut set = doc! {
            "payments_made": new_payments_made,
            "remaining_balance": bson::to_bson(&new_remaining).unwrap(),
        };
        if terminal {
            set.insert("status", bson::to_bson(&LoanStatus::Completed).unwrap());
            set.insert("remaining_balance", bson::to_bson(&Decimal::ZERO).unwrap());
        }

        let result = state
            .loans
            .update_one(filter, doc! { "$set": set })
            .await
            .map_err(anyhow::Error::from)?;
        if result.modified_count == 0 {
            // Lost the race to another concurrent run — it already claimed this slot.
            out.skipped += 1;
            continue;
        }

        state::create_transaction(
            state,
            ctx,
            NewTransaction {
                amount: loan.monthly_payment,
                currency: loan.currency.clone(),
                flow_type: FlowType::Expense,
                category_id: loan.category_id,
                description: format!("Loan payment: {}", loan.name),
                date: reference_date,
                entry_pattern: EntryPattern::Recurring,
                is_recurring: true,
                recurring_source_id: None,
                installment_id: None,
                installment_number: None,
                loan_id: Some(loan.id),
                credit_card_id: None,
                bank_account_id: None,
                original_amount: None,
                original_currency: None,
                exchange_rate: None,
            },
        )
        .await?;

        out.loans_charged += 1;
    }

    Ok(())
}

async fn process_fixed(
    state: &AppState,
    ctx: &DataContext,
    reference_date: NaiveDate,
    preview: bool,
    out: &mut ProcessRecurringResult,
    previews: &mut Vec<PreviewTransaction>,
) -> AppResult<()> {
    let candidates: Vec<_> = state::list_active_fixed_schedules(state, ctx)
        .await?
        .into_iter()
        .filter(|f| f.day_of_month == reference_date.day() && f.start_date <= reference_date)
        .filter(|f| f.end_date.is_none_or(|end| end >= reference_date))
        .collect();

    for fixed in candidates {
        if has_recurring_transaction(state, ctx, "recurring_source_id", fixed.id, reference_date).await? {
            out.skipped += 1;
            continue;
        }

        let description = format!("Fixed {}: {}", flow_type_str(fixed.flow_type), fixed.name);

        if preview {
            previews.push(PreviewTransaction {
                source: RecurringSource::Fixed,
                amount: fixed.amount,
                currency: fixed.currency.clone(),
                flow_type: fixed.flow_type,
                description,
                date: reference_date,
                category_id: fixed.category_id,
            });
            out.fixed_charged += 1;
            continue;
        }

        state::create_transaction(
            state,
            ctx,
            NewTransaction {
                amount: fixed.amount,
                currency: fixed.currency.clone(),
                flow_type: fixed.flow_type,
                category_id: fixed.category_id,
                description,
                date: reference_date,
                entry_pattern: EntryPattern::Recurring,
                is_recurring: true,
                recurring_source_id: Some(fixed.id),
                installment_id: None,
                installment_number: None,
                loan_id: None,
                credit_card_id: None,
                bank_account_id: None,
                original_amount: None,
                original_currency: None,
                exchange_rate: None,
            },
        )
        .await?;

        out.fixed_charged += 1;
    }

    Ok(())
}

async fn process_installments(
    state: &AppState,
    ctx: &DataContext,
    reference_date: NaiveDate,
    preview: bool,
    out: &mut ProcessRecurringResult,
    previews: &mut Vec<PreviewTransaction>,
) -> AppResult<()> {
    let candidates: Vec<_> = state::list_installments(state, ctx)
        .await?
        .into_iter()
        .filter(|i| i.day_of_month == reference_date.day())
        .collect();

    for installment in candidates {
        if installment.payments_completed >= installment.number_of_payments {
            out.skipped += 1;
            continue;
        }
        if has_recurring_transaction(state, ctx, "installment_id", installment.id, reference_date).await? {
            out.skipped += 1;
            continue;
        }

        let payment_number = installment.payments_completed + 1;
        let description = format!(
            "Installment: {} ({}/{})",
            installment.name, payment_number, installment.number_of_payments
        );

        if preview {
            previews.push(PreviewTransaction {
                source: RecurringSource::Installment,
                amount: installment.monthly_amount,
                currency: installment.currency.clone(),
                flow_type: installment.flow_type,
                description,
                date: reference_date,
                category_id: installment.category_id,
            });
            out.installments_charged += 1;
            continue;
        }

        let mut filter = ctx.ownership_filter();
        filter.insert("_id", installment.id);
        filter.insert(
            "payments_completed",
            bson::to_bson(&installment.payments_completed).unwrap(),
        );
        let result = state
            .installments
            .update_one(filter, doc! { "$inc": { "payments_completed": 1i32 } })
            .await
            .map_err(anyhow::Error::from)?;
        if result.modified_count == 0 {
            out.skipped += 1;
            continue;
        }

        state::create_transaction(
            state,
            ctx,
            NewTransaction {
                amount: installment.monthly_amount,
                currency: installment.currency.clone(),
                flow_type: installment.flow_type,
                category_id: installment.category_id,
                description,
                date: reference_date,
                entry_pattern: EntryPattern::Installment,
                is_recurring: true,
                recurring_source_id: None,
                installment_id: Some(installment.id),
                installment_number: Some(payment_number as i32),
                loan_id: None,
                credit_card_id: None,
                bank_account_id: None,
                original_amount: None,
                original_currency: None,
                exchange_rate: None,
            },
        )
        .await?;

        out.installments_charged += 1;
    }

    Ok(())
}

/// `ProcessRecurring`. In `preview` mode nothing is written; the result
/// lists what would be created instead (spec §4.G).
pub async fn process_recurring(
    state: &AppState,
    ctx: &DataContext,
    reference_date: NaiveDate,
    preview: bool,
) -> AppResult<ProcessRecurringResult> {
    let mut out = ProcessRecurringResult::default();
    let mut previews = Vec::new();

    process_loans(state, ctx, reference_date, preview, &mut out, &mut previews).await?;
    process_fixed(state, ctx, reference_date, preview, &mut out, &mut previews).await?;
    process_installments(state, ctx, reference_date, preview, &mut out, &mut previews).await?;

    if preview {
        out.preview_transactions = Some(previews);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_type_str_matches_wire_casing() {
        assert_eq!(flow_type_str(FlowType::Income), "income");
        assert_eq!(flow_type_str(FlowType::Expense), "expense");
    }
}
