//! Currency conversion (spec §4.B). A keyed rate table, not a live feed —
//! rates are not authoritative market data, so lookups fail open.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::money::round_half_up;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub converted_amount: Decimal,
    pub rate: Decimal,
}

/// Static table seeded with the pairs the original backend shipped with.
/// Missing pairs fail open (spec §4.B) rather than block a mutation on a
/// rate-service outage.
fn rate_table() -> HashMap<(&'static str, &'static str), Decimal> {
    use rust_decimal_macros::dec;
    HashMap::from([
        (("USD", "ILS"), dec!(3.70)),
        (("ILS", "USD"), dec!(0.27)),
        (("USD", "EUR"), dec!(0.92)),
        (("EUR", "USD"), dec!(1.09)),
        (("EUR", "ILS"), dec!(4.02)),
        (("ILS", "EUR"), dec!(0.25)),
    ])
}

/// `rate = 1` and the amount is returned unchanged when `from == to`.
/// An absent pair also fail-opens to `rate = 1` and is logged, per spec.
pub fn convert(amount: Decimal, from: &str, to: &str) -> ConversionResult {
    if from.eq_ignore_ascii_case(to) {
        return ConversionResult {
            converted_amount: round_half_up(amount),
            rate: Decimal::ONE,
        };
    }
    let table = rate_table();
    let rate = table
        .get(&(from, to))
        .copied()
        .unwrap_or_else(|| {
            tracing::warn!(from, to, "no exchange rate on file, falling back to 1:1");
            Decimal::ONE
        });
    ConversionResult {
        converted_amount: round_half_up(amount * rate),
        rate,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCurrencyFields {
    pub converted_amount: Decimal,
    pub original_amount: Decimal,
    pub original_currency: String,
    pub exchange_rate: Decimal,
}

/// The standard helper every entity creator calls to stamp both the
/// converted (base-currency) amount and the original triple (spec §4.B).
pub fn prepare_currency_fields(amount: Decimal, from: &str, base: &str) -> PreparedCurrencyFields {
    let result = convert(amount, from, base);
    PreparedCurrencyFields {
        converted_amount: result.converted_amount,
        original_amount: amount,
        original_currency: from.to_string(),
        exchange_rate: result.rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn same_currency_is_identity() {
        let result = convert(dec!(100.00), "USD", "USD");
        assert_eq!(result.rate, Decimal::ONE);
        assert_eq!(result.converted_amount, dec!(100.00));
    }

    #[test]
    fn known_pair_applies_rate() {
        let result = convert(dec!(10.00), "USD", "ILS");
        assert_eq!(result.rate, dec!(3.70));
        assert_eq!(result.converted_amount, dec!(37.00));
    }

    #[test]
    fn unknown_pair_fails_open_to_one() {
        let result = convert(dec!(50.00), "USD", "JPY");
        assert_eq!(result.rate, Decimal::ONE);
        assert_eq!(result.converted_amount, dec!(50.00));
    }

    #[test]
    fn prepare_currency_fields_preserves_original_triple() {
        let prepared = prepare_currency_fields(dec!(20.00), "EUR", "USD");
        assert_eq!(prepared.original_amount, dec!(20.00));
        assert_eq!(prepared.original_currency, "EUR");
        assert_eq!(prepared.exchange_rate, dec!(1.09));
        assert_eq!(prepared.converted_amount, dec!(21.80));
    }
}
