//! Dashboard, reports and store settings.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sapa_core::{CurrencyCode, Locale, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// Headline numbers on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub total_orders: u64,
    pub total_customers: u64,
    pub total_products: u64,
    #[serde(default)]
    pub pending_orders: u64,
    #[serde(default)]
    pub currency: CurrencyCode,
}

/// Window for the revenue chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevenuePeriod {
    #[default]
    Week,
    Month,
    Year,
}

impl RevenuePeriod {
    pub const ALL: [Self; 3] = [Self::Week, Self::Month, Self::Year];

    /// Query-string value: `7d`, `30d` or `12m`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Year => "12m",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

/// One bucket of the revenue series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub label: String,
    pub revenue: Decimal,
    #[serde(default)]
    pub orders: u64,
}

/// A best-selling product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub quantity_sold: u64,
    pub revenue: Decimal,
}

/// Inclusive date range for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the ends if given backwards.
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    /// The `days` days ending on `today`, inclusive.
    #[must_use]
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let from = today - chrono::Duration::days(i64::from(days.saturating_sub(1)));
        Self { from, to: today }
    }

    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("from", self.from.format("%Y-%m-%d").to_string()),
            ("to", self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}

/// Bucket size for the sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
}

impl GroupBy {
    pub const ALL: [Self; 3] = [Self::Day, Self::Week, Self::Month];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == value)
    }
}

/// One bucket of the sales report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesRow {
    pub period: String,
    pub orders: u64,
    pub revenue: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub average_order_value: Decimal,
}

/// Sales grouped by period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    #[serde(default)]
    pub rows: Vec<SalesRow>,
    #[serde(default)]
    pub total_revenue: Decimal,
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub currency: CurrencyCode,
}

/// Per-product sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReportRow {
    pub product_id: ProductId,
    pub name: String,
    pub quantity_sold: u64,
    pub revenue: Decimal,
    #[serde(default)]
    pub stock: i64,
}

/// Per-customer spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReportRow {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub orders: u64,
    pub total_spent: Decimal,
    #[serde(default)]
    pub last_order_at: Option<NaiveDateTime>,
}

/// Store-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub store_name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub default_locale: Locale,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_name: "Sapa Shop".to_string(),
            contact_email: None,
            contact_phone: None,
            address: None,
            currency: CurrencyCode::default(),
            default_locale: Locale::default(),
            shipping_fee: Decimal::ZERO,
            free_shipping_threshold: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_period_parse() {
        assert_eq!(RevenuePeriod::parse("30d"), Some(RevenuePeriod::Month));
        assert_eq!(RevenuePeriod::parse("1y"), None);
        assert_eq!(RevenuePeriod::default().as_str(), "7d");
    }

    #[test]
    fn test_date_range_normalises_order() {
        let a = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap_or_default();
        let b = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default();
        let range = DateRange::new(a, b);
        assert_eq!(range.from, b);
        assert_eq!(range.to, a);
        assert_eq!(
            range.to_pairs(),
            vec![
                ("from", "2026-03-01".to_string()),
                ("to", "2026-03-10".to_string())
            ]
        );
    }

    #[test]
    fn test_last_days_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 30).unwrap_or_default();
        let range = DateRange::last_days(today, 30);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default());
    }
}
