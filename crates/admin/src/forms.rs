//! Parsing helpers for console form fields.
//!
//! HTML forms post everything as text. These turn fields into typed values
//! or a message naming the field, which the handler re-renders with the
//! form.

use std::str::FromStr;

use rust_decimal::Decimal;
use sapa_core::Locale;

/// A required decimal amount, zero or more, written the `locale` way.
///
/// # Errors
///
/// Returns a message naming `field`.
pub fn amount(field: &str, value: &str, locale: Locale) -> Result<Decimal, String> {
    optional_amount(field, value, locale)?.ok_or_else(|| format!("{field} is required."))
}

/// An optional decimal amount; blank is `None`.
///
/// Only the locale's separators are accepted: in Vietnamese `1.250.000`
/// and `19,5`, in English `1,250,000` and `19.5`. Thousands groups must be
/// three digits, so `1,5` is not read as fifteen in English.
///
/// # Errors
///
/// Returns a message naming `field`.
pub fn optional_amount(
    field: &str,
    value: &str,
    locale: Locale,
) -> Result<Option<Decimal>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = parse_localized(value, locale)
        .ok_or_else(|| format!("{field} must be a number, e.g. {}.", example(locale)))?;
    if parsed.is_sign_negative() && !parsed.is_zero() {
        return Err(format!("{field} cannot be negative."));
    }
    Ok(Some(parsed))
}

fn parse_localized(value: &str, locale: Locale) -> Option<Decimal> {
    let (group, decimal) = locale.number_separators();
    let (sign, unsigned) = value
        .strip_prefix('-')
        .map_or(("", value), |rest| ("-", rest));

    let (int_part, frac_part) = match unsigned.split_once(decimal) {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut groups = int_part.split(group);
    let first = groups.next()?;
    if first.is_empty() || !is_digits(first) {
        return None;
    }
    let mut digits = first.to_string();
    let grouped = int_part.contains(group);
    if grouped && first.len() > 3 {
        return None;
    }
    for rest in groups {
        if rest.len() != 3 || !is_digits(rest) {
            return None;
        }
        digits.push_str(rest);
    }

    if let Some(frac) = frac_part {
        if frac.is_empty() || !is_digits(frac) {
            return None;
        }
        digits.push('.');
        digits.push_str(frac);
    }
    Decimal::from_str(&format!("{sign}{digits}")).ok()
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

const fn example(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "1.250.000 or 19,5",
        Locale::En => "1,250,000 or 19.5",
    }
}

/// An amount as the form field shows it: no grouping, the locale's
/// decimal separator, no trailing zeros.
#[must_use]
pub fn amount_value(amount: Decimal, locale: Locale) -> String {
    let (_, decimal) = locale.number_separators();
    amount.normalize().to_string().replace('.', &decimal.to_string())
}

/// An optional whole number; blank is `None`.
///
/// # Errors
///
/// Returns a message naming `field`.
pub fn optional_number<T: FromStr>(field: &str, value: &str) -> Result<Option<T>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("{field} must be a whole number."))
}

/// A required, non-blank text field.
///
/// # Errors
///
/// Returns a message naming `field`.
pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("{field} is required."))
    } else {
        Ok(value)
    }
}

/// Checkboxes post `on` when ticked and nothing otherwise.
#[must_use]
pub const fn checked(value: Option<&String>) -> bool {
    value.is_some()
}

/// Non-blank lines of a textarea, trimmed.
#[must_use]
pub fn lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_follows_vietnamese_separators() {
        let vi = Locale::Vi;
        assert_eq!(amount("Price", "1.250.000", vi).unwrap(), Decimal::new(1_250_000, 0));
        assert_eq!(amount("Price", "150.000", vi).unwrap(), Decimal::new(150_000, 0));
        assert_eq!(amount("Price", "150000", vi).unwrap(), Decimal::new(150_000, 0));
        assert_eq!(amount("Price", "1,5", vi).unwrap(), Decimal::new(15, 1));
        assert_eq!(amount("Price", "1.250,75", vi).unwrap(), Decimal::new(125_075, 2));
    }

    #[test]
    fn test_amount_follows_english_separators() {
        let en = Locale::En;
        assert_eq!(amount("Price", "1,250,000", en).unwrap(), Decimal::new(1_250_000, 0));
        assert_eq!(amount("Price", "19.99", en).unwrap(), Decimal::new(1999, 2));
        assert_eq!(amount("Price", "150.000", en).unwrap(), Decimal::new(150, 0));
    }

    #[test]
    fn test_amount_rejects_other_locale_and_bad_grouping() {
        for (value, locale) in [
            ("1,5", Locale::En),
            ("19.99", Locale::Vi),
            ("1,250.000", Locale::Vi),
            ("1.250,000", Locale::En),
            ("1.25.000", Locale::Vi),
            ("1234.567", Locale::Vi),
            ("1,2,3", Locale::Vi),
            ("12,", Locale::Vi),
            (".5", Locale::Vi),
        ] {
            assert!(
                amount("Price", value, locale).is_err(),
                "{value} should not parse in {locale:?}"
            );
        }
    }

    #[test]
    fn test_amount_errors_name_the_field() {
        let vi = Locale::Vi;
        assert_eq!(amount("Price", "", vi).unwrap_err(), "Price is required.");
        assert!(amount("Price", "abc", vi).unwrap_err().starts_with("Price must be a number"));
        assert_eq!(amount("Price", "-5", vi).unwrap_err(), "Price cannot be negative.");
    }

    #[test]
    fn test_amount_value_reads_back() {
        let price = Decimal::new(15_000_000, 2);
        assert_eq!(amount_value(price, Locale::Vi), "150000");
        assert_eq!(amount_value(Decimal::new(195, 1), Locale::Vi), "19,5");
        assert_eq!(amount_value(Decimal::new(195, 1), Locale::En), "19.5");
        assert_eq!(
            amount("Price", &amount_value(price, Locale::Vi), Locale::Vi).unwrap(),
            price
        );
    }

    #[test]
    fn test_optional_number() {
        assert_eq!(optional_number::<u32>("Usage limit", " ").unwrap(), None);
        assert_eq!(optional_number::<u32>("Usage limit", "10").unwrap(), Some(10));
        assert!(optional_number::<u32>("Usage limit", "-1").is_err());
    }

    #[test]
    fn test_lines_drop_blanks() {
        assert_eq!(
            lines("https://a.jpg\n\n  https://b.jpg \n"),
            vec!["https://a.jpg", "https://b.jpg"]
        );
    }
}
