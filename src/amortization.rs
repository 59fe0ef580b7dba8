//! Spitzer / declining-balance amortisation (spec §4.C). A pure function
//! of loan parameters and payments made; no I/O, no state.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::money::round_half_up;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Paid,
    Overdue,
    Due,
    Future,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmortizationRow {
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub interest: Decimal,
    pub principal: Decimal,
    pub payment_amount: Decimal,
    pub remaining_balance: Decimal,
    pub status: RowStatus,
}

pub struct LoanParams {
    pub original_amount: Decimal,
    pub monthly_payment: Decimal,
    pub interest_rate_annual_pct: Decimal,
    pub total_payments: u32,
    pub start_date: NaiveDate,
    pub day_of_month: u32,
    pub payments_made: u32,
}

/// Clamp `day_of_month` to the last day of the target month (spec §4.C.a,
/// §8 edge case "day-of-month clamp").
fn date_for_installment(start: NaiveDate, offset_months: u32, day_of_month: u32) -> NaiveDate {
    let total = start.year() as i64 * 12 + (start.month0() as i64) + offset_months as i64;
    let year = (total.div_euclid(12)) as i32;
    let month0 = total.rem_euclid(12) as u32;
    let month = month0 + 1;

    let last_day = last_day_of_month(year, month);
    let day = day_of_month.min(last_day);
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is always valid")
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    first_of_next.pred_opt().unwrap().day()
}

/// At creation, `monthly_payment` must exceed the interest accrued on the
/// original principal in month one, or the loan never amortises
/// (spec §4.C, **InvalidLoan**).
pub fn validate_loan_params(params: &LoanParams) -> AppResult<()> {
    if params.interest_rate_annual_pct > Decimal::ZERO {
        let monthly_rate = params.interest_rate_annual_pct / Decimal::from(100) / Decimal::from(12);
        let first_interest = round_half_up(params.original_amount * monthly_rate);
        if params.monthly_payment <= first_interest {
            return Err(AppError::invariant(
                "monthly_payment must exceed the interest accrued on the original balance",
            ));
        }
    }
    Ok(())
}

/// Produce the full schedule. Row `total_payments` absorbs all rounding
/// drift so `Σ principal = original_amount` exactly and the final
/// `remaining_balance` is `0` (spec §4.C.d).
pub fn build_schedule(params: &LoanParams, today: NaiveDate) -> Vec<AmortizationRow> {
    let monthly_rate = if params.interest_rate_annual_pct > Decimal::ZERO {
        params.interest_rate_annual_pct / Decimal::from(100) / Decimal::from(12)
    } else {
        Decimal::ZERO
    };

    let mut remaining = params.original_amount;
    let mut rows = Vec::with_capacity(params.total_payments as usize);

    for i in 1..=params.total_payments {
        let payment_date = date_for_installment(params.start_date, i - 1, params.day_of_month);
        let interest = round_half_up(remaining * monthly_rate);

        let (principal, payment_amount) = if i < params.total_payments {
            let principal = (params.monthly_payment - interest).min(remaining);
            (principal, params.monthly_payment)
        } else {
            (remaining, remaining + interest)
        };

        remaining -= principal;
        if remaining < Decimal::new(1, 2) {
            remaining = Decimal::ZERO;
        }

        let status = if i <= params.payments_made {
            RowStatus::Paid
        } else if payment_date < today {
            RowStatus::Overdue
        } else if payment_date.year() == today.year() && payment_date.month() == today.month() {
            RowStatus::Due
        } else {
            RowStatus::Future
        };

        rows.push(AmortizationRow {
            payment_number: i,
            payment_date,
            interest,
            principal,
            payment_amount,
            remaining_balance: remaining,
            status,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_params() -> LoanParams {
        LoanParams {
            original_amount: dec!(10000),
            monthly_payment: dec!(1000),
            interest_rate_annual_pct: Decimal::ZERO,
            total_payments: 10,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            day_of_month: 15,
            payments_made: 0,
        }
    }

    #[test]
    fn zero_interest_schedule_sums_to_principal() {
        let params = base_params();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let rows = build_schedule(&params, today);
        let total_principal: Decimal = rows.iter().map(|r| r.principal).sum();
        assert_eq!(total_principal, dec!(10000));
        assert_eq!(rows.last().unwrap().remaining_balance, Decimal::ZERO);
        for row in &rows {
            assert_eq!(row.principal + row.interest, row.payment_amount);
        }
    }

    #[test]
    fn interest_bearing_schedule_closes_to_zero() {
        let params = LoanParams {
            original_amount: dec!(12000),
            monthly_payment: dec!(1066.19),
            interest_rate_annual_pct: dec!(12),
            total_payments: 12,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            day_of_month: 15,
            payments_made: 0,
        };
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let rows = build_schedule(&params, today);
        let total_principal: Decimal = rows.iter().map(|r| r.principal).sum();
        assert_eq!(total_principal, dec!(12000));
        assert_eq!(rows.last().unwrap().remaining_balance, Decimal::ZERO);
        for row in &rows[..rows.len() - 1] {
            assert_eq!(row.principal + row.interest, row.payment_amount);
        }
    }

    #[test]
    fn day_of_month_clamps_to_last_day_of_february() {
        let params = LoanParams {
            original_amount: dec!(1000),
            monthly_payment: dec!(100),
            interest_rate_annual_pct: Decimal::ZERO,
            total_payments: 10,
            start_date: NaiveDate::from_ymd_opt(2027, 1, 31).unwrap(),
            day_of_month: 31,
            payments_made: 0,
        };
        let today = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        let rows = build_schedule(&params, today);
        assert_eq!(rows[1].payment_date, NaiveDate::from_ymd_opt(2027, 2, 28).unwrap());
        assert_eq!(rows[2].payment_date, NaiveDate::from_ymd_opt(2027, 3, 31).unwrap());
    }

    #[test]
    fn invalid_loan_rejected_when_payment_never_amortises() {
        let params = LoanParams {
            original_amount: dec!(100000),
            monthly_payment: dec!(50),
            interest_rate_annual_pct: dec!(24),
            total_payments: 12,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            day_of_month: 1,
            payments_made: 0,
        };
        assert!(validate_loan_params(&params).is_err());
    }

    #[test]
    fn status_tags_reflect_payments_made_and_today() {
        let params = LoanParams {
            payments_made: 2,
            ..base_params()
        };
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let rows = build_schedule(&params, today);
        assert_eq!(rows[0].status, RowStatus::Paid);
        assert_eq!(rows[1].status, RowStatus::Paid);
        assert_eq!(rows[2].status, RowStatus::Due);
        assert_eq!(rows[3].status, RowStatus::Future);
    }
}
