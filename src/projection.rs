//! Merges materialised transactions with virtual occurrences of recurring
//! entities over a date range, without double-counting (spec §4.D). Never
//! mutates state — "the deterministic witness of what the books say will
//! happen if nothing changes."

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::currency::convert;
use crate::errors::AppResult;
use crate::ids::Id;
use crate::models::{FixedSchedule, FlowType, Installment, Loan};
use crate::state::{self, AppState};
use crate::tenancy::DataContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionSource {
    Materialized,
    VirtualFixed,
    VirtualInstallment,
    VirtualLoan,
}

#[derive(Debug, Clone)]
pub struct ProjectionEntry {
    pub flow_type: FlowType,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub source: ProjectionSource,
    pub source_id: Option<Id>,
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

fn months_between(start: NaiveDate, year: i32, month: u32) -> i64 {
    (year as i64 * 12 + month as i64) - (start.year() as i64 * 12 + start.month() as i64)
}

/// Every `(y, m)` pair in `[start, end]`, inclusive of partial boundary
/// months.
fn month_span(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    let mut year = start.year();
    let mut month = start.month();
    loop {
        out.push((year, month));
        if year == end.year() && month == end.month() {
            break;
        }
        if month == 12 {
            month = 1;
            year += 1;
        } else {
            month += 1;
        }
    }
    out
}

fn fixed_admits_month(schedule: &FixedSchedule, year: i32, month: u32) -> bool {
    if !schedule.is_active {
        return false;
    }
    let month_start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let month_end = clamp_date(year, month, 31);
    if schedule.start_date > month_end {
        return false;
    }
    match schedule.end_date {
        Some(end) if end < month_start => false,
        _ => true,
    }
}

fn installment_admits_month(installment: &Installment, year: i32, month: u32) -> Option<u32> {
    let k = months_between(installment.start_date, year, month) + 1;
    if k < 1 || k as u32 > installment.number_of_payments {
        return None;
    }
    let k = k as u32;
    if k <= installment.payments_completed {
        return None;
    }
    Some(k)
}

fn loan_admits_month(loan: &Loan, year: i32, month: u32) -> Option<u32> {
    let k = months_between(loan.start_date, year, month) + 1;
    if k < 1 || k as u32 > loan.total_payments {
        return None;
    }
    let k = k as u32;
    if k <= loan.payments_made {
        return None;
    }
    Some(k)
}

/// Dedupe keys of `(source_id, year, month)` per provenance kind, derived
/// from already-materialised transactions — a virtual occurrence is
/// suppressed whenever its key is in this set.
struct MaterializedKeys {
    fixed: HashSet<(Id, i32, u32)>,
    installment: HashSet<(Id, i32, u32)>,
    loan: HashSet<(Id, i32, u32)>,
}

pub async fn project(
    state: &AppState,
    ctx: &DataContext,
    start: NaiveDate,
    end: NaiveDate,
    base_currency: Option<&str>,
) -> AppResult<Vec<ProjectionEntry>> {
    let mut entries = Vec::new();
    let mut keys = MaterializedKeys {
        fixed: HashSet::new(),
        installment: HashSet::new(),
        loan: HashSet::new(),
    };

    let filter = state::TransactionFilter {
        from_date: Some(start),
        to_date: Some(end),
        category_id: None,
        flow_type: None,
    };
    let materialized = state::list_transactions(state, ctx, &filter).await?;
    for tx in &materialized {
        let (y, m) = (tx.date.year(), tx.date.month());
        if let Some(source_id) = tx.recurring_source_id {
            keys.fixed.insert((source_id, y, m));
        }
        if let Some(installment_id) = tx.installment_id {
            keys.installment.insert((installment_id, y, m));
        }
        if let Some(loan_id) = tx.loan_id {
            keys.loan.insert((loan_id, y, m));
        }
        let amount = match base_currency {
            Some(base) => convert(tx.amount, &tx.currency, base).converted_amount,
            None => tx.amount,
        };
        entries.push(ProjectionEntry {
            flow_type: tx.flow_type,
            date: tx.date,
            amount,
            source: ProjectionSource::Materialized,
            source_id: None,
        });
    }

    let fixed_schedules = state::list_active_fixed_schedules(state, ctx).await?;
    let installments = state::list_installments(state, ctx).await?;
    let loans = state::list_active_loans(state, ctx).await?;

    for (year, month) in month_span(start, end) {
        for schedule in &fixed_schedules {
            if !fixed_admits_month(schedule, year, month) {
                continue;
            }
            if keys.fixed.contains(&(schedule.id, year, month)) {
                continue;
            }
            let date = clamp_date(year, month, schedule.day_of_month);
            if date < start || date > end {
                continue;
            }
            let amount = match base_currency {
                Some(base) => convert(schedule.amount, &schedule.currency, base).converted_amount,
                None => schedule.amount,
            };
            entries.push(ProjectionEntry {
                flow_type: schedule.flow_type,
                date,
                amount,
                source: ProjectionSource::VirtualFixed,
                source_id: Some(schedule.id),
            });
        }

        for installment in &installments {
            if installment_admits_month(installment, year, month).is_none() {
                continue;
            }
            if keys.installment.contains(&(installment.id, year, month)) {
                continue;
            }
            let date = clamp_date(year, month, installment.day_of_month);
            if date < start || date > end {
                continue;
            }
            let amount = match base_currency {
                Some(base) => convert(installment.monthly_amount, &installment.currency, base).converted_amount,
                None => installment.monthly_amount,
            };
            entries.push(ProjectionEntry {
                flow_type: installment.flow_type,
                date,
                amount,
                source: ProjectionSource::VirtualInstallment,
                source_id: Some(installment.id),
            });
        }

        for loan in &loans {
            if loan_admits_month(loan, year, month).is_none() {
                continue;
            }
            if keys.loan.contains(&(loan.id, year, month)) {
                continue;
            }
            let date = clamp_date(year, month, loan.day_of_month);
            if date < start || date > end {
                continue;
            }
            let amount = match base_currency {
                Some(base) => convert(loan.monthly_payment, &loan.currency, base).converted_amount,
                None => loan.monthly_payment,
            };
            entries.push(ProjectionEntry {
                flow_type: FlowType::Expense,
                date,
                amount,
                source: ProjectionSource::VirtualLoan,
                source_id: Some(loan.id),
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_span_covers_inclusive_range() {
        let start = NaiveDate::from_ymd_opt(2026, 11, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2027, 1, 5).unwrap();
        assert_eq!(month_span(start, end), vec![(2026, 11), (2026, 12), (2027, 1)]);
    }

    #[test]
    fn clamp_date_handles_february() {
        assert_eq!(clamp_date(2027, 2, 31), NaiveDate::from_ymd_opt(2027, 2, 28).unwrap());
        assert_eq!(clamp_date(2028, 2, 31), NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn installment_admits_month_respects_payments_completed() {
        let installment = Installment {
            id: crate::ids::new_id(),
            owner: crate::models::OwnerScope::personal(crate::ids::new_id()),
            name: "Laptop".into(),
            total_amount: Decimal::new(120000, 2),
            monthly_amount: Decimal::new(10000, 2),
            number_of_payments: 12,
            payments_completed: 3,
            flow_type: FlowType::Expense,
            category_id: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            day_of_month: 10,
            currency: "USD".into(),
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            created_at: chrono::Utc::now(),
        };
        assert_eq!(installment_admits_month(&installment, 2026, 1), None);
        assert_eq!(installment_admits_month(&installment, 2026, 4), Some(4));
        assert_eq!(installment_admits_month(&installment, 2027, 1), None);
    }
}
