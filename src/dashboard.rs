//! Read-only derived views over the entity store (spec §4.F), ported from
//! `financial_aggregator.py` / `dashboard.py`'s bucketed scoring.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::models::FlowType;
use crate::state::{self, AppState};
use crate::tenancy::DataContext;

fn month_bounds(month_start: NaiveDate) -> NaiveDate {
    let (year, month) = (month_start.year(), month_start.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
}

async fn sum_transactions(
    state: &AppState,
    ctx: &DataContext,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<(Decimal, Decimal)> {
    let filter = state::TransactionFilter {
        from_date: Some(start),
        to_date: Some(end),
        category_id: None,
        flow_type: None,
    };
    let rows = state::list_transactions(state, ctx, &filter).await?;
    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    for tx in &rows {
        match tx.flow_type {
            FlowType::Income => income += tx.amount,
            FlowType::Expense => expenses += tx.amount,
        }
    }
    Ok((income, expenses))
}

/// `(curr − prev) / |prev| × 100`; `0 → 0 ⇒ 0`; `0 → x ⇒ 100` (spec §4.F).
fn pct_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return if current.is_zero() { Decimal::ZERO } else { Decimal::ONE_HUNDRED };
    }
    ((current - previous) / previous.abs() * Decimal::ONE_HUNDRED).round_dp(2)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub current_balance: Decimal,
    pub monthly_income: Decimal,
    pub monthly_expenses: Decimal,
    pub net_cashflow: Decimal,
    pub balance_trend: Decimal,
    pub income_trend: Decimal,
    pub expense_trend: Decimal,
}

pub async fn summary(state: &AppState, ctx: &DataContext, today: NaiveDate) -> AppResult<DashboardSummary> {
    let this_month_start = today.with_day(1).unwrap();
    let this_month_end = month_bounds(this_month_start);
    let prev_month_end = this_month_start - Duration::days(1);
    let prev_month_start = prev_month_end.with_day(1).unwrap();

    let current_balance = state::current_balance(state, ctx).await?;
    let (this_income, this_expenses) = sum_transactions(state, ctx, this_month_start, this_month_end).await?;
    let (prev_income, prev_expenses) = sum_transactions(state, ctx, prev_month_start, prev_month_end).await?;

    let net_cashflow = this_income - this_expenses;
    let prev_net = prev_income - prev_expenses;

    Ok(DashboardSummary {
        current_balance,
        monthly_income: this_income,
        monthly_expenses: this_expenses,
        net_cashflow,
        balance_trend: pct_change(net_cashflow, prev_net),
        income_trend: pct_change(this_income, prev_income),
        expense_trend: pct_change(this_expenses, prev_expenses),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodPoint {
    pub period_label: String,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
    pub running_balance: Decimal,
}

/// Running balance is back-computed so the final point equals the current
/// balance (spec §4.F: "running_last = current_balance, earlier points
/// subtract net moving backwards").
fn backfill_running_balance(current_balance: Decimal, nets: &[Decimal]) -> Vec<Decimal> {
    let total_net: Decimal = nets.iter().sum();
    let mut running = current_balance - total_net;
    nets.iter()
        .map(|net| {
            running += *net;
            running
        })
        .collect()
}

pub async fn weekly_series(state: &AppState, ctx: &DataContext, today: NaiveDate) -> AppResult<Vec<PeriodPoint>> {
    let current_balance = state::current_balance(state, ctx).await?;
    let days_since_sunday = today.weekday().num_days_from_sunday() as i64;
    let current_week_start = today - Duration::days(days_since_sunday);
    let first_week_start = current_week_start - Duration::weeks(11);

    let mut weeks = Vec::with_capacity(12);
    for i in 0..12 {
        let start = first_week_start + Duration::weeks(i);
        let end = start + Duration::days(6);
        let (income, expenses) = sum_transactions(state, ctx, start, end).await?;
        weeks.push((start.format("%Y-%m-%d").to_string(), income, expenses));
    }

    let nets: Vec<Decimal> = weeks.iter().map(|(_, i, e)| i - e).collect();
    let running = backfill_running_balance(current_balance, &nets);

    Ok(weeks
        .into_iter()
        .zip(running)
        .map(|((label, income, expenses), running_balance)| PeriodPoint {
            period_label: label,
            income,
            expenses,
            net: income - expenses,
            running_balance,
        })
        .collect())
}

pub async fn monthly_series(state: &AppState, ctx: &DataContext, today: NaiveDate) -> AppResult<Vec<PeriodPoint>> {
    let current_balance = state::current_balance(state, ctx).await?;
    let anchor = today.with_day(1).unwrap();

    let mut months = Vec::with_capacity(12);
    for i in (0..12).rev() {
        let total_offset = anchor.year() as i64 * 12 + anchor.month0() as i64 - i;
        let year = total_offset.div_euclid(12) as i32;
        let month = total_offset.rem_euclid(12) as u32 + 1;
        let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let end = month_bounds(start);
        let (income, expenses) = sum_transactions(state, ctx, start, end).await?;
        months.push((start.format("%Y-%m").to_string(), income, expenses));
    }

    let nets: Vec<Decimal> = months.iter().map(|(_, i, e)| i - e).collect();
    let running = backfill_running_balance(current_balance, &nets);

    Ok(months
        .into_iter()
        .zip(running)
        .map(|((label, income, expenses), running_balance)| PeriodPoint {
            period_label: label,
            income,
            expenses,
            net: income - expenses,
            running_balance,
        })
        .collect())
}

pub async fn quarterly_series(state: &AppState, ctx: &DataContext, today: NaiveDate) -> AppResult<Vec<PeriodPoint>> {
    let current_balance = state::current_balance(state, ctx).await?;
    let current_q_month = ((today.month() - 1) / 3) * 3 + 1;
    let current_q_start = NaiveDate::from_ymd_opt(today.year(), current_q_month, 1).unwrap();

    let mut quarters = Vec::with_capacity(8);
    for i in (0..8).rev() {
        let total_offset = current_q_start.year() as i64 * 12 + current_q_start.month0() as i64 - i * 3;
        let year = total_offset.div_euclid(12) as i32;
        let month = total_offset.rem_euclid(12) as u32 + 1;
        let q_start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let q_end_month_total = year as i64 * 12 + (month as i64 - 1) + 2;
        let q_end_year = q_end_month_total.div_euclid(12) as i32;
        let q_end_month = q_end_month_total.rem_euclid(12) as u32 + 1;
        let q_end = month_bounds(NaiveDate::from_ymd_opt(q_end_year, q_end_month, 1).unwrap());
        let q_num = (q_start.month() - 1) / 3 + 1;
        let label = format!("{}-Q{}", q_start.year(), q_num);

        let (income, expenses) = sum_transactions(state, ctx, q_start, q_end).await?;
        quarters.push((label, income, expenses));
    }

    let nets: Vec<Decimal> = quarters.iter().map(|(_, i, e)| i - e).collect();
    let running = backfill_running_balance(current_balance, &nets);

    Ok(quarters
        .into_iter()
        .zip(running)
        .map(|((label, income, expenses), running_balance)| PeriodPoint {
            period_label: label,
            income,
            expenses,
            net: income - expenses,
            running_balance,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdownItem {
    pub category_id: Option<crate::ids::Id>,
    pub category_name: String,
    pub category_color: String,
    pub total_amount: Decimal,
    pub percentage: Decimal,
    pub transaction_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub items: Vec<CategoryBreakdownItem>,
    pub total_expenses: Decimal,
    pub period: String,
}

pub async fn category_breakdown(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
) -> AppResult<CategoryBreakdown> {
    let month_start = today.with_day(1).unwrap();
    let month_end = month_bounds(month_start);

    let filter = state::TransactionFilter {
        from_date: Some(month_start),
        to_date: Some(month_end),
        category_id: None,
        flow_type: Some(FlowType::Expense),
    };
    let rows = state::list_transactions(state, ctx, &filter).await?;
    let categories = state::list_categories(state, ctx).await?;

    let mut buckets: std::collections::HashMap<Option<crate::ids::Id>, (Decimal, u32)> =
        std::collections::HashMap::new();
    for tx in &rows {
        let entry = buckets.entry(tx.category_id).or_insert((Decimal::ZERO, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let total_expenses: Decimal = buckets.values().map(|(amount, _)| *amount).sum();

    let mut items: Vec<CategoryBreakdownItem> = buckets
        .into_iter()
        .map(|(category_id, (total_amount, count))| {
            let category = category_id.and_then(|id| categories.iter().find(|c| c.id == id));
            let percentage = if total_expenses.is_zero() {
                Decimal::ZERO
            } else {
                (total_amount / total_expenses * Decimal::ONE_HUNDRED).round_dp(2)
            };
            CategoryBreakdownItem {
                category_id,
                category_name: category.map(|c| c.name.clone()).unwrap_or_else(|| "Uncategorized".to_string()),
                category_color: category.map(|c| c.color.clone()).unwrap_or_else(|| "#6B7280".to_string()),
                total_amount,
                percentage,
                transaction_count: count,
            }
        })
        .collect();
    items.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));

    Ok(CategoryBreakdown {
        items,
        total_expenses,
        period: today.format("%Y-%m").to_string(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpcomingSource {
    Fixed,
    Installment,
    Loan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub id: crate::ids::Id,
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub source: UpcomingSource,
    pub flow_type: FlowType,
    pub due_date: NaiveDate,
    pub days_until_due: i64,
    pub installment_info: Option<String>,
}

/// Day-of-month clamping handles `day_of_month=31` landing on the last day
/// of February; returns `None` if no occurrence falls within the window.
fn next_occurrence(day_of_month: u32, today: NaiveDate, max_days: i64) -> Option<NaiveDate> {
    for month_offset in 0..((max_days / 28) + 3) {
        let total = today.year() as i64 * 12 + (today.month() as i64 - 1) + month_offset;
        let year = total.div_euclid(12) as i32;
        let month = total.rem_euclid(12) as u32 + 1;
        let next_month_total = year as i64 * 12 + (month as i64 - 1) + 1;
        let last_day = NaiveDate::from_ymd_opt(
            next_month_total.div_euclid(12) as i32,
            next_month_total.rem_euclid(12) as u32 + 1,
            1,
        )
        .unwrap()
        .pred_opt()
        .unwrap()
        .day();
        let actual_day = day_of_month.min(last_day);
        let candidate = NaiveDate::from_ymd_opt(year, month, actual_day).unwrap();
        if candidate < today {
            continue;
        }
        let days_until = (candidate - today).num_days();
        if days_until > max_days {
            return None;
        }
        return Some(candidate);
    }
    None
}

pub async fn upcoming_payments(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
    days: i64,
) -> AppResult<Vec<UpcomingPayment>> {
    let mut items = Vec::new();

    for schedule in state::list_active_fixed_schedules(state, ctx).await? {
        let Some(due_date) = next_occurrence(schedule.day_of_month, today, days) else {
            continue;
        };
        if schedule.start_date > due_date {
            continue;
        }
        if schedule.end_date.is_some_and(|end| end < due_date) {
            continue;
        }
        items.push(UpcomingPayment {
            id: schedule.id,
            name: schedule.name,
            amount: schedule.amount,
            currency: schedule.currency,
            source: UpcomingSource::Fixed,
            flow_type: schedule.flow_type,
            due_date,
            days_until_due: (due_date - today).num_days(),
            installment_info: None,
        });
    }

    for installment in state::list_installments(state, ctx).await? {
        if installment.payments_completed >= installment.number_of_payments {
            continue;
        }
        let Some(due_date) = next_occurrence(installment.day_of_month, today, days) else {
            continue;
        };
        items.push(UpcomingPayment {
            id: installment.id,
            name: installment.name,
            amount: installment.monthly_amount,
            currency: installment.currency,
            source: UpcomingSource::Installment,
            flow_type: installment.flow_type,
            due_date,
            days_until_due: (due_date - today).num_days(),
            installment_info: Some(format!(
                "{}/{}",
                installment.payments_completed + 1,
                installment.number_of_payments
            )),
        });
    }

    for loan in state::list_active_loans(state, ctx).await? {
        let Some(due_date) = next_occurrence(loan.day_of_month, today, days) else {
            continue;
        };
        items.push(UpcomingPayment {
            id: loan.id,
            name: loan.name,
            amount: loan.monthly_payment,
            currency: loan.currency,
            source: UpcomingSource::Loan,
            flow_type: FlowType::Expense,
            due_date,
            days_until_due: (due_date - today).num_days(),
            installment_info: None,
        });
    }

    items.sort_by_key(|item| item.due_date);
    Ok(items)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthFactor {
    pub name: &'static str,
    pub score: i32,
    pub weight: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialHealth {
    pub score: i32,
    pub grade: &'static str,
    pub factors: Vec<HealthFactor>,
}

/// Five weighted factors, each a 0/20/60/100-style bucketed score
/// (SPEC_FULL.md §B, ported verbatim from `financial_aggregator.py`).
pub async fn financial_health(state: &AppState, ctx: &DataContext, today: NaiveDate) -> AppResult<FinancialHealth> {
    use rust_decimal_macros::dec;

    let this_month_start = today.with_day(1).unwrap();
    let this_month_end = month_bounds(this_month_start);
    let prev_month_end = this_month_start - Duration::days(1);
    let prev_month_start = prev_month_end.with_day(1).unwrap();
    let three_months_ago_start = {
        let total = this_month_start.year() as i64 * 12 + this_month_start.month0() as i64 - 2;
        NaiveDate::from_ymd_opt(
            total.div_euclid(12) as i32,
            total.rem_euclid(12) as u32 + 1,
            1,
        )
        .unwrap()
    };

    let (this_income, this_expenses) = sum_transactions(state, ctx, this_month_start, this_month_end).await?;
    let (prev_income, prev_expenses) = sum_transactions(state, ctx, prev_month_start, prev_month_end).await?;
    let current_balance = state::current_balance(state, ctx).await?;

    let loans = state::list_active_loans(state, ctx).await?;
    let total_loan_payments: Decimal = loans.iter().map(|l| l.monthly_payment).sum();
    let installments = state::list_installments(state, ctx).await?;
    let total_installment_payments: Decimal = installments
        .iter()
        .filter(|i| matches!(i.flow_type, FlowType::Expense) && i.payments_completed < i.number_of_payments)
        .map(|i| i.monthly_amount)
        .sum();
    let total_debt_payments = total_loan_payments + total_installment_payments;

    // Factor 1: savings ratio, 30%.
    let (savings_score, savings_desc) = if this_income > Decimal::ZERO {
        let ratio = (this_income - this_expenses) / this_income;
        let score = if ratio >= dec!(0.20) {
            100
        } else if ratio >= dec!(0.10) {
            75
        } else if ratio >= Decimal::ZERO {
            50
        } else {
            0
        };
        (score, format!("Savings ratio: {}%", (ratio * Decimal::ONE_HUNDRED).round_dp(1)))
    } else if this_expenses > Decimal::ZERO {
        (0, "No income recorded this month".to_string())
    } else {
        (50, "No income recorded this month".to_string())
    };

    // Factor 2: debt ratio, 25%.
    let (debt_score, debt_desc) = if this_income > Decimal::ZERO {
        let ratio = total_debt_payments / this_income;
        let score = if ratio < dec!(0.30) {
            100
        } else if ratio <= dec!(0.50) {
            60
        } else {
            20
        };
        (
            score,
            format!("Debt payments are {}% of income", (ratio * Decimal::ONE_HUNDRED).round_dp(1)),
        )
    } else if total_debt_payments.is_zero() {
        (100, "No debt payments".to_string())
    } else {
        (0, "Debt payments with no income".to_string())
    };

    // Factor 3: balance trend, 20%.
    let this_net = this_income - this_expenses;
    let prev_net = prev_income - prev_expenses;
    let (trend_score, trend_desc) = if this_net > prev_net {
        (100, "Balance trend is improving")
    } else if this_net == prev_net {
        (70, "Balance trend is stable")
    } else {
        (30, "Balance trend is declining")
    };

    // Factor 4: expense stability (coefficient of variation), 15%.
    let mut expense_values = Vec::with_capacity(3);
    for i in 0..3 {
        let total = three_months_ago_start.year() as i64 * 12 + three_months_ago_start.month0() as i64 + i;
        let year = total.div_euclid(12) as i32;
        let month = total.rem_euclid(12) as u32 + 1;
        let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let end = month_bounds(start);
        let (_, expenses) = sum_transactions(state, ctx, start, end).await?;
        expense_values.push(expenses);
    }
    let (stability_score, stability_desc) = if expense_values.iter().any(|v| *v > Decimal::ZERO) {
        let avg = expense_values.iter().sum::<Decimal>() / Decimal::from(expense_values.len() as u64);
        if avg > Decimal::ZERO {
            let variance = expense_values.iter().map(|v| (*v - avg) * (*v - avg)).sum::<Decimal>()
                / Decimal::from(expense_values.len() as u64);
            let variance_f64: f64 = variance.try_into().unwrap_or(0.0);
            let std_dev = Decimal::from_f64_retain(variance_f64.sqrt()).unwrap_or(Decimal::ZERO);
            let cv = std_dev / avg;
            let score = if cv < dec!(0.15) {
                100
            } else if cv < dec!(0.30) {
                70
            } else {
                30
            };
            (score, format!("Expense variability (CV): {}%", (cv * Decimal::ONE_HUNDRED).round_dp(1)))
        } else {
            (100, "No expenses in the last 3 months".to_string())
        }
    } else {
        (100, "No expenses in the last 3 months".to_string())
    };

    // Factor 5: emergency fund, 10%.
    let (emergency_score, emergency_desc) = if this_expenses > Decimal::ZERO {
        let months_covered = current_balance / this_expenses;
        let score = if months_covered >= dec!(3) {
            100
        } else if months_covered >= dec!(1) {
            60
        } else {
            20
        };
        (score, format!("Balance covers {} months of expenses", months_covered.round_dp(1)))
    } else if current_balance > Decimal::ZERO {
        (100, "No expenses to compare against".to_string())
    } else {
        (50, "No balance and no expenses data".to_string())
    };

    let factors = vec![
        HealthFactor {
            name: "savings_ratio",
            score: savings_score,
            weight: dec!(0.30),
            description: savings_desc,
        },
        HealthFactor {
            name: "debt_ratio",
            score: debt_score,
            weight: dec!(0.25),
            description: debt_desc,
        },
        HealthFactor {
            name: "balance_trend",
            score: trend_score,
            weight: dec!(0.20),
            description: trend_desc.to_string(),
        },
        HealthFactor {
            name: "expense_stability",
            score: stability_score,
            weight: dec!(0.15),
            description: stability_desc,
        },
        HealthFactor {
            name: "emergency_fund",
            score: emergency_score,
            weight: dec!(0.10),
            description: emergency_desc,
        },
    ];

    let total_score: Decimal = factors.iter().map(|f| Decimal::from(f.score) * f.weight).sum();
    let score = total_score.round().to_string().parse::<i32>().unwrap_or(0);

    let grade = if score >= 80 {
        "excellent"
    } else if score >= 60 {
        "good"
    } else if score >= 40 {
        "fair"
    } else if score >= 20 {
        "poor"
    } else {
        "critical"
    };

    Ok(FinancialHealth { score, grade, factors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pct_change_zero_to_zero_is_zero() {
        assert_eq!(pct_change(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn pct_change_zero_to_nonzero_is_hundred() {
        assert_eq!(pct_change(dec!(50), Decimal::ZERO), dec!(100));
    }

    #[test]
    fn pct_change_computes_signed_delta() {
        assert_eq!(pct_change(dec!(150), dec!(100)), dec!(50));
        assert_eq!(pct_change(dec!(50), dec!(100)), dec!(-50));
    }

    #[test]
    fn backfill_running_balance_ends_at_current_balance() {
        let nets = vec![dec!(100), dec!(-50), dec!(200)];
        let running = backfill_running_balance(dec!(1000), &nets);
        assert_eq!(*running.last().unwrap(), dec!(1000));
    }

    #[test]
    fn next_occurrence_clamps_day_of_month_in_february() {
        let today = NaiveDate::from_ymd_opt(2027, 1, 20).unwrap();
        let due = next_occurrence(31, today, 60).unwrap();
        assert_eq!(due, NaiveDate::from_ymd_opt(2027, 2, 28).unwrap());
    }
}
