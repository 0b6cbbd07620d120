//! Formatting shared by the console pages.
//!
//! Console chrome is English; money and dates follow the configured
//! locale and are shown in shop-local time.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sapa_core::{CurrencyCode, Locale, Money, OrderStatus, PaymentMethod, PaymentStatus};

/// Shop-local display time (ICT, UTC+7).
const DISPLAY_OFFSET_SECS: i32 = 7 * 3600;

/// `datetime-local` input format.
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

fn shop_offset() -> Option<FixedOffset> {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS)
}

fn shop_local(at: &DateTime<Utc>) -> NaiveDateTime {
    shop_offset().map_or_else(|| at.naive_utc(), |offset| at.with_timezone(&offset).naive_local())
}

/// The shop-local calendar date of `now`.
#[must_use]
pub fn shop_date(now: &DateTime<Utc>) -> NaiveDate {
    shop_local(now).date()
}

/// Render a timestamp in shop-local time, in the locale's date order.
#[must_use]
pub fn format_datetime(at: &DateTime<Utc>, locale: Locale) -> String {
    let local = shop_local(at);
    match locale {
        Locale::Vi => local.format("%d/%m/%Y %H:%M").to_string(),
        Locale::En => local.format("%b %-d, %Y %H:%M").to_string(),
    }
}

/// Render a naive timestamp as sent by the reports API.
#[must_use]
pub fn format_naive(at: &NaiveDateTime, locale: Locale) -> String {
    format_datetime(&Utc.from_utc_datetime(at), locale)
}

#[must_use]
pub fn money(amount: Decimal, currency: CurrencyCode, locale: Locale) -> String {
    Money::new(amount, currency).format(locale)
}

/// Value for a `datetime-local` input, in shop-local time.
#[must_use]
pub fn to_input_datetime(at: &DateTime<Utc>) -> String {
    shop_local(at).format(INPUT_FORMAT).to_string()
}

/// Parse a `datetime-local` input given in shop-local time.
///
/// Blank input is `Ok(None)`.
///
/// # Errors
///
/// Returns the unparseable input.
pub fn parse_input_datetime(value: &str) -> Result<Option<DateTime<Utc>>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let naive = NaiveDateTime::parse_from_str(value, INPUT_FORMAT)
        .map_err(|_| format!("invalid date and time: {value}"))?;
    let offset = shop_offset().ok_or_else(|| "invalid shop offset".to_string())?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|at| Some(at.with_timezone(&Utc)))
        .ok_or_else(|| format!("invalid date and time: {value}"))
}

/// Order status label in `locale`, for customer-facing mail.
#[must_use]
pub const fn status_label(status: OrderStatus, locale: Locale) -> &'static str {
    match locale {
        Locale::En => status_text(status),
        Locale::Vi => match status {
            OrderStatus::Pending => "Chờ xác nhận",
            OrderStatus::Processing => "Đang xử lý",
            OrderStatus::Shipped => "Đang giao",
            OrderStatus::Delivered => "Đã giao",
            OrderStatus::Cancelled => "Đã hủy",
            OrderStatus::Refunded => "Đã hoàn tiền",
            OrderStatus::CancellationRequested => "Chờ hủy",
            OrderStatus::RefundRequested => "Chờ hoàn tiền",
        },
    }
}

/// English order status label for the console.
#[must_use]
pub const fn status_text(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Processing => "Processing",
        OrderStatus::Shipped => "Shipped",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
        OrderStatus::Refunded => "Refunded",
        OrderStatus::CancellationRequested => "Cancellation requested",
        OrderStatus::RefundRequested => "Refund requested",
    }
}

/// CSS modifier for an order status badge.
#[must_use]
pub const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "badge--pending",
        OrderStatus::Processing => "badge--processing",
        OrderStatus::Shipped => "badge--shipped",
        OrderStatus::Delivered => "badge--delivered",
        OrderStatus::Cancelled | OrderStatus::Refunded => "badge--closed",
        OrderStatus::CancellationRequested | OrderStatus::RefundRequested => "badge--attention",
    }
}

/// Label of the button that moves an order from `from` to `to`.
#[must_use]
pub const fn transition_action(from: OrderStatus, to: OrderStatus) -> &'static str {
    match (from, to) {
        (OrderStatus::CancellationRequested, OrderStatus::Processing) => "Reject cancellation",
        (OrderStatus::CancellationRequested, OrderStatus::Cancelled) => "Approve cancellation",
        (OrderStatus::RefundRequested, OrderStatus::Delivered) => "Reject refund",
        (OrderStatus::RefundRequested, OrderStatus::Refunded) => "Approve refund",
        (_, OrderStatus::Processing) => "Confirm order",
        (_, OrderStatus::Shipped) => "Mark shipped",
        (_, OrderStatus::Delivered) => "Mark delivered",
        (_, OrderStatus::Cancelled) => "Cancel order",
        (_, OrderStatus::Refunded) => "Refund",
        (_, other) => status_text(other),
    }
}

#[must_use]
pub const fn payment_status_text(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Unpaid => "Unpaid",
        PaymentStatus::Paid => "Paid",
        PaymentStatus::Refunded => "Refunded",
        PaymentStatus::Failed => "Failed",
    }
}

#[must_use]
pub const fn payment_method_text(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cod => "Cash on delivery",
        PaymentMethod::BankTransfer => "Bank transfer",
        PaymentMethod::Card => "Card",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_is_shown_in_shop_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 0).unwrap();
        assert_eq!(format_datetime(&at, Locale::Vi), "02/03/2026 03:30");
        assert_eq!(format_datetime(&at, Locale::En), "Mar 2, 2026 03:30");
    }

    #[test]
    fn test_shop_date_rolls_over_at_five_pm_utc() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).unwrap();
        assert_eq!(shop_date(&at), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn test_input_datetime_is_shop_local() {
        let at = parse_input_datetime("2026-02-10T07:00").unwrap().unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap());
        assert_eq!(to_input_datetime(&at), "2026-02-10T07:00");
    }

    #[test]
    fn test_blank_and_bad_input_datetime() {
        assert_eq!(parse_input_datetime("  ").unwrap(), None);
        assert!(parse_input_datetime("10/02/2026").is_err());
    }

    #[test]
    fn test_status_labels_by_locale() {
        assert_eq!(status_label(OrderStatus::Shipped, Locale::Vi), "Đang giao");
        assert_eq!(status_label(OrderStatus::Shipped, Locale::En), "Shipped");
    }

    #[test]
    fn test_transition_actions_name_the_request() {
        assert_eq!(
            transition_action(OrderStatus::RefundRequested, OrderStatus::Delivered),
            "Reject refund"
        );
        assert_eq!(
            transition_action(OrderStatus::Pending, OrderStatus::Processing),
            "Confirm order"
        );
    }

    #[test]
    fn test_money_follows_locale() {
        let amount = Decimal::new(1_250_000, 0);
        assert_eq!(money(amount, CurrencyCode::VND, Locale::Vi), "1.250.000 ₫");
        assert_eq!(money(amount, CurrencyCode::VND, Locale::En), "1,250,000 ₫");
    }
}
