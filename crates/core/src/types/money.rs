//! Monetary amounts and locale-aware price formatting.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::locale::Locale;

/// ISO 4217 currency codes the shop can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
    USD,
}

impl CurrencyCode {
    /// Number of fraction digits shown for this currency.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::VND => 0,
            Self::USD => 2,
        }
    }

    /// Currency symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::VND => "₫",
            Self::USD => "$",
        }
    }

    /// ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::VND => "VND",
            Self::USD => "USD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VND" => Ok(Self::VND),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// An amount in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (dong, dollars).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Format for display in the given UI locale.
    ///
    /// | currency | `vi`          | `en`          |
    /// |----------|---------------|---------------|
    /// | VND      | `1.250.000 ₫` | `1,250,000 ₫` |
    /// | USD      | `$1.234,50`   | `$1,234.50`   |
    ///
    /// Amounts are rounded half away from zero to the currency's minor
    /// units. A negative sign always leads.
    #[must_use]
    pub fn format(&self, locale: Locale) -> String {
        let digits = self.currency.minor_units();
        let rounded = self
            .amount
            .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let plain = format!("{:.*}", digits as usize, rounded.abs());

        let (group_sep, decimal_sep) = locale.number_separators();

        let (int_part, frac_part) = plain
            .split_once('.')
            .map_or((plain.as_str(), None), |(i, f)| (i, Some(f)));

        let mut number = group_thousands(int_part, group_sep);
        if let Some(frac) = frac_part {
            number.push(decimal_sep);
            number.push_str(frac);
        }

        let sign = if negative { "-" } else { "" };
        match self.currency {
            CurrencyCode::VND => format!("{sign}{number} {}", self.currency.symbol()),
            CurrencyCode::USD => format!("{sign}{}{number}", self.currency.symbol()),
        }
    }
}

/// Insert a separator every three digits from the right.
fn group_thousands(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn vnd(amount: i64) -> Money {
        Money::new(Decimal::from(amount), CurrencyCode::VND)
    }

    fn usd(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    #[test]
    fn test_vnd_formatting() {
        assert_eq!(vnd(1_250_000).format(Locale::Vi), "1.250.000 ₫");
        assert_eq!(vnd(1_250_000).format(Locale::En), "1,250,000 ₫");
        assert_eq!(vnd(999).format(Locale::Vi), "999 ₫");
        assert_eq!(vnd(0).format(Locale::Vi), "0 ₫");
    }

    #[test]
    fn test_usd_formatting() {
        assert_eq!(usd(123_450).format(Locale::En), "$1,234.50");
        assert_eq!(usd(123_450).format(Locale::Vi), "$1.234,50");
        assert_eq!(usd(5).format(Locale::En), "$0.05");
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let m = Money::new(Decimal::new(15, 1), CurrencyCode::VND);
        assert_eq!(m.format(Locale::Vi), "2 ₫");

        let m = Money::new(Decimal::new(-15, 1), CurrencyCode::VND);
        assert_eq!(m.format(Locale::Vi), "-2 ₫");

        let m = Money::new(Decimal::new(10_005, 3), CurrencyCode::USD);
        assert_eq!(m.format(Locale::En), "$10.01");
    }

    #[test]
    fn test_negative_sign_leads() {
        assert_eq!(usd(-2_000).format(Locale::En), "-$20.00");
        assert_eq!(vnd(-50_000).format(Locale::Vi), "-50.000 ₫");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1", ','), "1");
        assert_eq!(group_thousands("1000", ','), "1,000");
        assert_eq!(group_thousands("100000", '.'), "100.000");
        assert_eq!(group_thousands("1234567", ','), "1,234,567");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("vnd".parse::<CurrencyCode>(), Ok(CurrencyCode::VND));
        assert_eq!(" USD ".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert!("EUR".parse::<CurrencyCode>().is_err());
    }
}
