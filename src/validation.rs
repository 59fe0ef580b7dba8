//! Schema-boundary validators (spec §6 "Validation floors"). Amount
//! shape lives in `money::is_valid_amount`; everything else that's
//! shared across entity create/update handlers lives here.

use crate::errors::{AppError, AppResult};

/// Strips `<...>` tags (not their content) and trims, matching the
/// original's defense against stored-markup in free-text name fields.
pub fn strip_html_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// A display name: non-empty after HTML-tag stripping.
pub fn validate_name(raw: &str) -> AppResult<String> {
    let cleaned = strip_html_tags(raw);
    if cleaned.is_empty() {
        return Err(AppError::Schema("name must not be empty".into()));
    }
    Ok(cleaned)
}

/// `^#[0-9a-fA-F]{6}$`.
pub fn validate_color(color: &str) -> AppResult<()> {
    let bytes = color.as_bytes();
    let ok = bytes.len() == 7
        && bytes[0] == b'#'
        && bytes[1..].iter().all(|b| b.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(AppError::Schema("color must match #RRGGBB".into()))
    }
}

/// Exactly three letters, case-insensitive (ISO 4217-shaped, not a
/// validated currency-code table lookup).
pub fn validate_currency(code: &str) -> AppResult<String> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(AppError::Schema("currency must be a 3-letter code".into()))
    }
}

pub fn validate_day_of_month(day: u32) -> AppResult<()> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(AppError::Schema("day_of_month must be between 1 and 31".into()))
    }
}

pub fn validate_billing_day(day: u32) -> AppResult<()> {
    if (1..=28).contains(&day) {
        Ok(())
    } else {
        Err(AppError::Schema("billing_day must be between 1 and 28".into()))
    }
}

/// At least 8 characters with upper, lower, and digit (spec §6; the
/// length floor is also enforced in `auth::register`).
pub fn validate_password_strength(password: &str) -> AppResult<()> {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if password.len() >= 8 && has_upper && has_lower && has_digit {
        Ok(())
    } else {
        Err(AppError::Schema(
            "password must be at least 8 characters and include an uppercase letter, a lowercase letter, and a digit".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_but_keeps_inner_text() {
        assert_eq!(strip_html_tags("<b>Rent</b>"), "Rent");
        assert_eq!(strip_html_tags("  Groceries  "), "Groceries");
    }

    #[test]
    fn name_validation_rejects_tag_only_input() {
        assert!(validate_name("<script></script>").is_err());
        assert!(validate_name("Utilities").is_ok());
    }

    #[test]
    fn color_validation() {
        assert!(validate_color("#1A2b3C").is_ok());
        assert!(validate_color("#1A2b3").is_err());
        assert!(validate_color("1A2b3C").is_err());
        assert!(validate_color("#1A2b3G").is_err());
    }

    #[test]
    fn currency_validation_uppercases() {
        assert_eq!(validate_currency("usd").unwrap(), "USD");
        assert!(validate_currency("us").is_err());
        assert!(validate_currency("USDT").is_err());
    }

    #[test]
    fn day_of_month_and_billing_day_ranges_differ() {
        assert!(validate_day_of_month(31).is_ok());
        assert!(validate_billing_day(31).is_err());
        assert!(validate_billing_day(28).is_ok());
    }

    #[test]
    fn password_strength_requires_all_three_classes() {
        assert!(validate_password_strength("Abcdefg1").is_ok());
        assert!(validate_password_strength("abcdefgh").is_err());
        assert!(validate_password_strength("ABCDEFG1").is_err());
        assert!(validate_password_strength("Abcdefgh").is_err());
        assert!(validate_password_strength("Ab1").is_err());
    }
}
