//! Monthly and weekly cash-flow forecasts (spec §4.E). Built on top of the
//! projection service's virtual/materialised merge.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::models::FlowType;
use crate::projection::{ProjectionSource, project};
use crate::state::{self, AppState};
use crate::tenancy::DataContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyForecastPoint {
    pub month: NaiveDate,
    pub opening_balance: Decimal,
    pub fixed_income: Decimal,
    pub fixed_expenses: Decimal,
    pub installment_payments: Decimal,
    pub loan_payments: Decimal,
    pub expected_income: Decimal,
    pub one_time_income: Decimal,
    pub one_time_expenses: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyForecast {
    pub current_balance: Decimal,
    pub months: Vec<MonthlyForecastPoint>,
    pub has_negative_months: bool,
    pub first_negative_month: Option<NaiveDate>,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 is always valid")
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() as i64 * 12 + date.month0() as i64 + months as i64;
    let year = total.div_euclid(12) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).expect("first-of-month is always valid")
}

fn month_end(month_start: NaiveDate) -> NaiveDate {
    add_months(month_start, 1).pred_opt().expect("never underflows")
}

pub async fn compute_monthly_forecast(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
    months: u32,
) -> AppResult<MonthlyForecast> {
    let current_balance = state::current_balance(state, ctx).await?;
    let mut running_balance = current_balance;
    let mut points = Vec::with_capacity(months as usize);
    let mut first_negative_month = None;

    let anchor = first_of_month(today);

    for i in 0..months {
        let month_start = add_months(anchor, i);
        let end = month_end(month_start);
        let entries = project(state, ctx, month_start, end, None).await?;

        let mut fixed_income = Decimal::ZERO;
        let mut fixed_expenses = Decimal::ZERO;
        let mut installment_payments = Decimal::ZERO;
        let mut loan_payments = Decimal::ZERO;
        let mut one_time_income = Decimal::ZERO;
        let mut one_time_expenses = Decimal::ZERO;

        for entry in &entries {
            match entry.source {
                ProjectionSource::VirtualFixed => match entry.flow_type {
                    FlowType::Income => fixed_income += entry.amount,
                    FlowType::Expense => fixed_expenses += entry.amount,
                },
                ProjectionSource::VirtualInstallment => installment_payments += entry.amount,
                ProjectionSource::VirtualLoan => loan_payments += entry.amount,
                ProjectionSource::Materialized => match entry.flow_type {
                    FlowType::Income => one_time_income += entry.amount,
                    FlowType::Expense => one_time_expenses += entry.amount,
                },
            }
        }

        let expected_income = state::get_expected_income(state, ctx, month_start).await?;

        let total_income = fixed_income + expected_income + one_time_income;
        let total_expenses = fixed_expenses + installment_payments + loan_payments + one_time_expenses;
        let net = total_income - total_expenses;
        let opening = running_balance;
        let closing = opening + net;

        if closing < Decimal::ZERO && first_negative_month.is_none() {
            first_negative_month = Some(month_start);
        }

        points.push(MonthlyForecastPoint {
            month: month_start,
            opening_balance: opening,
            fixed_income,
            fixed_expenses,
            installment_payments,
            loan_payments,
            expected_income,
            one_time_income,
            one_time_expenses,
            total_income,
            total_expenses,
            net,
            closing_balance: closing,
        });

        running_balance = closing;
    }

    Ok(MonthlyForecast {
        current_balance,
        has_negative_months: first_negative_month.is_some(),
        first_negative_month,
        months: points,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyForecastPoint {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub opening_balance: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyForecast {
    pub current_balance: Decimal,
    pub weeks: Vec<WeeklyForecastPoint>,
}

/// Week anchored to the most recent Sunday on/before `today`
/// (SPEC_FULL.md §B — supplemented from `forecast_service.py`).
fn most_recent_sunday(today: NaiveDate) -> NaiveDate {
    let offset = today.weekday().num_days_from_sunday();
    today - Days::new(offset as u64)
}

pub async fn compute_weekly_forecast(
    state: &AppState,
    ctx: &DataContext,
    today: NaiveDate,
    weeks: u32,
) -> AppResult<WeeklyForecast> {
    let current_balance = state::current_balance(state, ctx).await?;
    let mut running_balance = current_balance;
    let mut out = Vec::with_capacity(weeks as usize);

    let anchor = most_recent_sunday(today);

    for i in 0..weeks {
        let week_start = anchor + Days::new(i as u64 * 7);
        let week_end = week_start + Days::new(6);
        let entries = project(state, ctx, week_start, week_end, None).await?;

        let mut total_income = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        for entry in &entries {
            match entry.flow_type {
                FlowType::Income => total_income += entry.amount,
                FlowType::Expense => total_expenses += entry.amount,
            }
        }

        let net = total_income - total_expenses;
        let opening = running_balance;
        let closing = opening + net;

        out.push(WeeklyForecastPoint {
            week_start,
            week_end,
            opening_balance: opening,
            total_income,
            total_expenses,
            net,
            closing_balance: closing,
        });

        running_balance = closing;
    }

    Ok(WeeklyForecast {
        current_balance,
        weeks: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_recent_sunday_is_idempotent_on_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();
        assert_eq!(sunday.weekday().num_days_from_sunday(), 0);
        assert_eq!(most_recent_sunday(sunday), sunday);
    }

    #[test]
    fn most_recent_sunday_walks_back_from_midweek() {
        let wednesday = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert_eq!(
            most_recent_sunday(wednesday),
            NaiveDate::from_ymd_opt(2026, 8, 2).unwrap()
        );
    }

    #[test]
    fn add_months_rolls_year_boundary() {
        let date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert_eq!(add_months(date, 2), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }
}
