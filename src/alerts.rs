//! Alert engine (spec §4.H). Regenerates two alert families —
//! forecast-derived and entity-derived — by reconciling a freshly computed
//! desired-state against what is already stored, keyed on each alert's
//! deterministic `key`. Existing alerts are updated in place so `is_read`
//! and `created_at` survive regeneration; alerts whose key drops out of the
//! fresh set are retired.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::errors::AppResult;
use crate::forecast::compute_monthly_forecast;
use crate::ids::{Id, new_id};
use crate::models::{Alert, AlertSeverity, FlowType};
use crate::money::format_thousands;
use crate::state::{self, AppState, TransactionFilter};
use crate::tenancy::DataContext;

const FORECAST_ALERT_TYPES: &[&str] = &["negative_cashflow", "approaching_negative", "high_expenses"];
const ENTITY_ALERT_TYPES: &[&str] = &[
    "high_single_expense",
    "high_income",
    "payment_overdue",
    "upcoming_payment",
    "loan_ending_soon",
    "installment_ending_soon",
];

/// A fresh desired-state row, matched against existing alerts by `key`.
struct AlertDraft {
    key: String,
    alert_type: &'static str,
    severity: AlertSeverity,
    title: String,
    message: String,
    related_entity_type: Option<String>,
    related_entity_id: Option<Id>,
    related_month: Option<NaiveDate>,
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    first_of_next.pred_opt().unwrap().day()
}

fn clamp_date(year: i32, month: u32, day_of_month: u32) -> NaiveDate {
    let day = day_of_month.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is always valid")
}

fn shift_month(year: i32, month: u32, offset: u32) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + offset as i64;
    let y = total.div_euclid(12) as i32;
    let m = total.rem_euclid(12) as u32 + 1;
    (y, m)
}

fn shift_month_signed(year: i32, month: u32, offset: i64) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + offset;
    let y = total.div_euclid(12) as i32;
    let m = total.rem_euclid(12) as u32 + 1;
    (y, m)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 is always valid")
}

/// Next unpaid payment date of a loan/installment: offset is
/// `payments_done` months from `start_date`, day clamped into the target
/// month (spec §8 "day-of-month clamp" edge case, reused from the
/// amortisation schedule logic).
fn next_payment_date(start_date: NaiveDate, day_of_month: u32, payments_done: u32) -> NaiveDate {
    let (year, month) = shift_month(start_date.year(), start_date.month(), payments_done);
    clamp_date(year, month, day_of_month)
}

async fn sum_flow(
    state: &AppState,
    ctx: &DataContext,
    flow_type: FlowType,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Decimal> {
    let filter = TransactionFilter {
        from_date: Some(from),
        to_date: Some(to),
        category_id: None,
        flow_type: Some(flow_type),
    };
    let transactions = state::list_transactions(state, ctx, &filter).await?;
    Ok(transactions.iter().map(|t| t.amount).sum())
}

// ---------------------------------------------------------------------
// Forecast-derived drafts
// ---------------------------------------------------------------------

fn forecast_drafts(forecast: &crate::forecast::MonthlyForecast) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    for point in &forecast.months {
        let month_label = point.month.format("%B %Y").to_string();

        if point.closing_balance < Decimal::ZERO {
            let severity = if point.closing_balance < Decimal::new(-500000, 2) {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };
            let title = format!("Negative balance projected — {month_label}");
            let message = format!(
                "The projected closing balance for {month_label} is {} (overdrawn).\n\n\
                 Income: {}\nExpenses: {}\nNet: {}\n\n\
                 Review large expenses or plan additional income for this month.",
                format_thousands(point.closing_balance),
                format_thousands(point.total_income),
                format_thousands(point.total_expenses),
                format_thousands(point.net),
            );
            drafts.push(AlertDraft {
                key: format!("negative_cashflow:{}", point.month),
                alert_type: "negative_cashflow",
                severity,
                title,
                message,
                related_entity_type: Some("forecast".into()),
                related_entity_id: None,
                related_month: Some(point.month),
            });
        } else if point.closing_balance < Decimal::new(100000, 2) {
            let title = format!("Low balance projected — {month_label}");
            let message = format!(
                "The projected closing balance for {month_label} is only {}.\n\n\
                 Income: {}\nExpenses: {}\n\n\
                 Keep a close eye on this month in case of an unplanned expense.",
                format_thousands(point.closing_balance),
                format_thousands(point.total_income),
                format_thousands(point.total_expenses),
            );
            drafts.push(AlertDraft {
                key: format!("approaching_negative:{}", point.month),
                alert_type: "approaching_negative",
                severity: AlertSeverity::Info,
                title,
                message,
                related_entity_type: Some("forecast".into()),
                related_entity_id: None,
                related_month: Some(point.month),
            });
        }

        if point.net < Decimal::new(-1000000, 2) {
            let title = format!("High-expense month ahead — {month_label}");
            let message = format!(
                "{month_label} is projected to carry unusually high expenses.\n\n\
                 Income: {}\nExpenses: {}\nNet: {}\n\n\
                 Consider deferring or trimming discretionary spending.",
                format_thousands(point.total_income),
                format_thousands(point.total_expenses),
                format_thousands(point.net),
            );
            drafts.push(AlertDraft {
                key: format!("high_expenses:{}", point.month),
                alert_type: "high_expenses",
                severity: AlertSeverity::Info,
                title,
                message,
                related_entity_type: Some("forecast".into()),
                related_entity_id: None,
                related_month: Some(point.month),
            });
        }
    }

    drafts
}

// ---------------------------------------------------------------------
// Entity-derived drafts
// ---------------------------------------------------------------------

async fn high_single_expense_drafts(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
) -> AppResult<Vec<AlertDraft>> {
    let start = month_start(today);
    let end = clamp_date(today.year(), today.month(), 31);
    let filter = TransactionFilter {
        from_date: Some(start),
        to_date: Some(end),
        category_id: None,
        flow_type: Some(FlowType::Expense),
    };
    let transactions = state::list_transactions(state, ctx, &filter).await?;

    let threshold = Decimal::new(500000, 2);
    Ok(transactions
        .into_iter()
        .filter(|tx| tx.amount > threshold)
        .map(|tx| {
            let desc = tx.description.clone();
            let title = format!("Large expense — {}", format_thousands(tx.amount));
            let message = format!(
                "A large one-time expense was recorded:\n\n\
                 Amount: {}\nDescription: {}\nDate: {}\n\n\
                 Confirm this expense was planned and update the budget if needed.",
                format_thousands(tx.amount),
                desc,
                tx.date.format("%d/%m/%Y"),
            );
            AlertDraft {
                key: format!("high_single_expense:{}", tx.id),
                alert_type: "high_single_expense",
                severity: AlertSeverity::Warning,
                title,
                message,
                related_entity_type: Some("transaction".into()),
                related_entity_id: Some(tx.id),
                related_month: Some(start),
            }
        })
        .collect())
}

async fn high_income_draft(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
) -> AppResult<Vec<AlertDraft>> {
    let current_start = month_start(today);
    let current_end = clamp_date(today.year(), today.month(), 31);
    let current_income = sum_flow(state, ctx, FlowType::Income, current_start, current_end).await?;
    if current_income <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let (prev_year, prev_month) =
        shift_month_signed(current_start.year(), current_start.month(), -3);
    let three_months_ago_start = NaiveDate::from_ymd_opt(prev_year, prev_month, 1).unwrap();
    let prev_month_end = current_start.pred_opt().expect("never underflows");

    let total_prev_income =
        sum_flow(state, ctx, FlowType::Income, three_months_ago_start, prev_month_end).await?;
    let avg_income = total_prev_income / Decimal::from(3);

    if avg_income <= Decimal::ZERO || current_income <= avg_income * Decimal::new(15, 1) {
        return Ok(Vec::new());
    }

    let title = format!("Unusually high income — {}", current_start.format("%B %Y"));
    let message = format!(
        "Income in {} is well above the recent average.\n\n\
         This month's income: {}\n3-month average: {}\n\n\
         A good opportunity to save or get ahead on payments.",
        current_start.format("%B %Y"),
        format_thousands(current_income),
        format_thousands(avg_income),
    );

    Ok(vec![AlertDraft {
        key: format!("high_income:{current_start}"),
        alert_type: "high_income",
        severity: AlertSeverity::Info,
        title,
        message,
        related_entity_type: Some("income".into()),
        related_entity_id: None,
        related_month: Some(current_start),
    }])
}

async fn overdue_and_upcoming_drafts(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
) -> AppResult<Vec<AlertDraft>> {
    let mut drafts = Vec::new();
    let three_days_ahead = today + chrono::Days::new(3);

    for installment in state::list_installments(state, ctx).await? {
        let remaining = installment.number_of_payments.saturating_sub(installment.payments_completed);
        if remaining == 0 {
            continue;
        }
        let expected = next_payment_date(
            installment.start_date,
            installment.day_of_month,
            installment.payments_completed,
        );

        if expected < today {
            let title = format!("Payment overdue — {}", installment.name);
            let message = format!(
                "An installment payment was due and has not been recorded:\n\n\
                 Name: {}\nAmount: {}\nDue date: {}\n\n\
                 Resolve this payment as soon as possible.",
                installment.name,
                format_thousands(installment.monthly_amount),
                expected.format("%d/%m/%Y"),
            );
            drafts.push(AlertDraft {
                key: format!("payment_overdue:installment:{}", installment.id),
                alert_type: "payment_overdue",
                severity: AlertSeverity::Critical,
                title,
                message,
                related_entity_type: Some("installment".into()),
                related_entity_id: Some(installment.id),
                related_month: Some(month_start(expected)),
            });
        } else if expected <= three_days_ahead {
            let title = format!("Upcoming payment — {}", installment.name);
            let message = format!(
                "An installment payment is coming up:\n\n\
                 Name: {}\nAmount: {}\nDue date: {}\n\n\
                 Make sure there is enough balance in the account.",
                installment.name,
                format_thousands(installment.monthly_amount),
                expected.format("%d/%m/%Y"),
            );
            drafts.push(AlertDraft {
                key: format!("upcoming_payment:installment:{}:{expected}", installment.id),
                alert_type: "upcoming_payment",
                severity: AlertSeverity::Info,
                title,
                message,
                related_entity_type: Some("installment".into()),
                related_entity_id: Some(installment.id),
                related_month: Some(month_start(expected)),
            });
        }
    }

    for loan in state::list_active_loans(state, ctx).await? {
        let remaining = loan.total_payments.saturating_sub(loan.payments_made);
        if remaining == 0 {
            continue;
        }
        let expected = next_payment_date(loan.start_date, loan.day_of_month, loan.payments_made);

        if expected < today {
            let title = format!("Payment overdue — {}", loan.name);
            let message = format!(
                "A loan payment was due and has not been recorded:\n\n\
                 Name: {}\nAmount: {}\nDue date: {}\n\n\
                 Resolve this payment as soon as possible.",
                loan.name,
                format_thousands(loan.monthly_payment),
                expected.format("%d/%m/%Y"),
            );
            drafts.push(AlertDraft {
                key: format!("payment_overdue:loan:{}", loan.id),
                alert_type: "payment_overdue",
                severity: AlertSeverity::Critical,
                title,
                message,
                related_entity_type: Some("loan".into()),
                related_entity_id: Some(loan.id),
                related_month: Some(month_start(expected)),
            });
        } else if expected <= three_days_ahead {
            let title = format!("Upcoming payment — {}", loan.name);
            let message = format!(
                "A loan payment is coming up:\n\n\
                 Name: {}\nAmount: {}\nDue date: {}\n\n\
                 Make sure there is enough balance in the account.",
                loan.name,
                format_thousands(loan.monthly_payment),
                expected.format("%d/%m/%Y"),
            );
            drafts.push(AlertDraft {
                key: format!("upcoming_payment:loan:{}:{expected}", loan.id),
                alert_type: "upcoming_payment",
                severity: AlertSeverity::Info,
                title,
                message,
                related_entity_type: Some("loan".into()),
                related_entity_id: Some(loan.id),
                related_month: Some(month_start(expected)),
            });
        }
    }

    Ok(drafts)
}

async fn loan_ending_soon_drafts(state: &AppState, ctx: &DataContext) -> AppResult<Vec<AlertDraft>> {
    Ok(state::list_active_loans(state, ctx)
        .await?
        .into_iter()
        .filter_map(|loan| {
            let remaining = loan.total_payments.saturating_sub(loan.payments_made);
            if remaining == 0 || remaining >= 3 {
                return None;
            }
            let title = format!("Loan ending soon — {}", loan.name);
            let message = format!(
                "The loan \"{}\" is nearing its final payment.\n\n\
                 Payments remaining: {}\nMonthly payment: {}\n\n\
                 That monthly budget will soon free up.",
                loan.name,
                remaining,
                format_thousands(loan.monthly_payment),
            );
            Some(AlertDraft {
                key: format!("loan_ending_soon:{}", loan.id),
                alert_type: "loan_ending_soon",
                severity: AlertSeverity::Info,
                title,
                message,
                related_entity_type: Some("loan".into()),
                related_entity_id: Some(loan.id),
                related_month: None,
            })
        })
        .collect())
}

async fn installment_ending_soon_drafts(
    state: &AppState,
    ctx: &DataContext,
) -> AppResult<Vec<AlertDraft>> {
    Ok(state::list_installments(state, ctx)
        .await?
        .into_iter()
        .filter_map(|installment| {
            let remaining =
                installment.number_of_payments.saturating_sub(installment.payments_completed);
            if remaining == 0 || remaining >= 2 {
                return None;
            }
            let title = format!("Installments ending soon — {}", installment.name);
            let message = format!(
                "The installment plan \"{}\" is nearing its final payment.\n\n\
                 Payments remaining: {}\nMonthly amount: {}\n\n\
                 That recurring expense will soon drop off.",
                installment.name,
                remaining,
                format_thousands(installment.monthly_amount),
            );
            Some(AlertDraft {
                key: format!("installment_ending_soon:{}", installment.id),
                alert_type: "installment_ending_soon",
                severity: AlertSeverity::Info,
                title,
                message,
                related_entity_type: Some("installment".into()),
                related_entity_id: Some(installment.id),
                related_month: None,
            })
        })
        .collect())
}

// ---------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------

async fn reconcile(
    state: &AppState,
    ctx: &DataContext,
    existing: HashMap<String, Alert>,
    drafts: Vec<AlertDraft>,
) -> AppResult<Vec<Alert>> {
    let mut kept = HashSet::new();
    let mut out = Vec::with_capacity(drafts.len());

    for draft in drafts {
        kept.insert(draft.key.clone());

        if let Some(current) = existing.get(&draft.key) {
            state::refresh_alert_fields(state, ctx, current.id, &draft.title, &draft.message, draft.severity)
                .await?;
            out.push(Alert {
                title: draft.title,
                message: draft.message,
                severity: draft.severity,
                ..current.clone()
            });
        } else {
            let alert = Alert {
                id: new_id(),
                owner: ctx.stamp(),
                key: draft.key,
                alert_type: draft.alert_type.to_string(),
                severity: draft.severity,
                title: draft.title,
                message: draft.message,
                related_entity_type: draft.related_entity_type,
                related_entity_id: draft.related_entity_id,
                related_month: draft.related_month,
                is_read: false,
                is_dismissed: false,
                created_at: Utc::now(),
            };
            state::insert_alert(state, &alert).await?;
            out.push(alert);
        }
    }

    for (key, alert) in &existing {
        if !kept.contains(key) {
            state::delete_alert_by_id(state, ctx, alert.id).await?;
        }
    }

    Ok(out)
}

/// `GenerateAlerts`. Forecast computation failures are swallowed — a
/// degraded forecast must never block entity-derived alerts (spec §4.H
/// step 5).
pub async fn generate_alerts(state: &AppState, ctx: &DataContext, today: NaiveDate, months: u32) -> AppResult<Vec<Alert>> {
    let existing_forecast = state::list_non_dismissed_by_types(state, ctx, FORECAST_ALERT_TYPES)
        .await?
        .into_iter()
        .map(|a| (a.key.clone(), a))
        .collect::<HashMap<_, _>>();

    let forecast_drafts = match compute_monthly_forecast(state, ctx, today, months).await {
        Ok(forecast) => forecast_drafts(&forecast),
        Err(err) => {
            tracing::error!(error = %err, "failed to compute forecast for alert generation");
            Vec::new()
        }
    };

    let mut result = reconcile(state, ctx, existing_forecast, forecast_drafts).await?;

    let existing_entity = state::list_non_dismissed_by_types(state, ctx, ENTITY_ALERT_TYPES)
        .await?
        .into_iter()
        .map(|a| (a.key.clone(), a))
        .collect::<HashMap<_, _>>();

    let mut entity_drafts = Vec::new();
    entity_drafts.extend(high_single_expense_drafts(state, ctx, today).await?);
    entity_drafts.extend(high_income_draft(state, ctx, today).await?);
    entity_drafts.extend(overdue_and_upcoming_drafts(state, ctx, today).await?);
    entity_drafts.extend(loan_ending_soon_drafts(state, ctx).await?);
    entity_drafts.extend(installment_ending_soon_drafts(state, ctx).await?);

    result.extend(reconcile(state, ctx, existing_entity, entity_drafts).await?);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_payment_date_clamps_into_february() {
        let start = NaiveDate::from_ymd_opt(2027, 1, 31).unwrap();
        assert_eq!(next_payment_date(start, 31, 1), NaiveDate::from_ymd_opt(2027, 2, 28).unwrap());
        assert_eq!(next_payment_date(start, 31, 2), NaiveDate::from_ymd_opt(2027, 3, 31).unwrap());
    }

    #[test]
    fn shift_month_signed_crosses_year_boundary_backward() {
        assert_eq!(shift_month_signed(2026, 2, -3), (2025, 11));
    }

    #[test]
    fn forecast_drafts_flags_negative_closing_as_critical_below_threshold() {
        let point = crate::forecast::MonthlyForecastPoint {
            month: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            opening_balance: Decimal::new(20000, 2),
            fixed_income: Decimal::ZERO,
            fixed_expenses: Decimal::new(1500000, 2),
            installment_payments: Decimal::ZERO,
            loan_payments: Decimal::ZERO,
            expected_income: Decimal::ZERO,
            one_time_income: Decimal::ZERO,
            one_time_expenses: Decimal::ZERO,
            total_income: Decimal::ZERO,
            total_expenses: Decimal::new(1500000, 2),
            net: Decimal::new(-1500000, 2),
            closing_balance: Decimal::new(-1480000, 2),
        };
        let forecast = crate::forecast::MonthlyForecast {
            current_balance: Decimal::new(20000, 2),
            months: vec![point],
            has_negative_months: true,
            first_negative_month: Some(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()),
        };
        let drafts = forecast_drafts(&forecast);
        let negative = drafts.iter().find(|d| d.alert_type == "negative_cashflow").unwrap();
        assert_eq!(negative.severity, AlertSeverity::Critical);
    }
}
