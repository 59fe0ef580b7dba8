//! Fixed-point money helpers.
//!
//! All monetary amounts are `Decimal` at scale 2. Nothing in this crate
//! passes an amount through `f64`, even transiently (spec §9).

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use std::str::FromStr;

pub type Money = Decimal;

/// Round to 2 decimal places, half-up (ties away from zero), matching
/// Python's `Decimal.quantize(..., ROUND_HALF_UP)` used by the original
/// source.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `ceil_to_cent` — rounds up to the next cent, used for
/// `monthly_amount = ceil(total_amount / number_of_payments)` so that
/// the last installment absorbs the residue instead of falling short.
pub fn ceil_to_cent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
}

pub fn zero() -> Decimal {
    Decimal::ZERO
}

pub fn parse_money(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok().map(round_half_up)
}

/// Validation floor: amount > 0, at most 2 decimal places, at most 13
/// integer digits (spec §6).
pub fn is_valid_amount(value: Decimal) -> bool {
    if value <= Decimal::ZERO {
        return false;
    }
    if value.scale() > 2 {
        return false;
    }
    let integer_digits = value.trunc().to_string().trim_start_matches('-').len() as u32;
    integer_digits <= 13
}

/// Format an amount with thousands separators and no decimal places, for
/// alert copy (e.g. `12,345`).
pub fn format_thousands(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative();
    let digits = rounded.trunc().abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();
    if negative { format!("-{grouped}") } else { grouped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_thousands_groups_and_drops_decimals() {
        assert_eq!(format_thousands(dec!(1234567.89)), "1,234,568");
        assert_eq!(format_thousands(dec!(-5000)), "-5,000");
        assert_eq!(format_thousands(dec!(42)), "42");
    }

    #[test]
    fn half_up_rounds_away_from_zero_on_tie() {
        assert_eq!(round_half_up(dec!(1.005)), dec!(1.01));
        assert_eq!(round_half_up(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn ceil_to_cent_never_rounds_down() {
        assert_eq!(ceil_to_cent(dec!(333.331)), dec!(333.34));
        assert_eq!(ceil_to_cent(dec!(333.33)), dec!(333.33));
    }

    #[test]
    fn amount_validation_floor() {
        assert!(is_valid_amount(dec!(10.50)));
        assert!(!is_valid_amount(dec!(0)));
        assert!(!is_valid_amount(dec!(-5)));
        assert!(!is_valid_amount(dec!(10.505)));
    }
}
