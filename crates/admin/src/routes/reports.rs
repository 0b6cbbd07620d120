//! Sales, product and customer reports, with CSV download.
//!
//! Every report takes an inclusive `from`/`to` date range (shop-local
//! dates, defaulting to the last 30 days). Adding `format=csv` to any
//! report URL downloads the same rows as a spreadsheet.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sapa_api::types::{CustomerReportRow, DateRange, GroupBy, ProductReportRow, SalesReport};
use sapa_core::{CurrencyCode, Locale};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::page::AdminPage;
use crate::state::AppState;
use crate::views::{format_naive, money, shop_date};

/// Days covered when no range is given.
const DEFAULT_DAYS: u32 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub group_by: Option<String>,
    pub format: Option<String>,
}

impl ReportQuery {
    /// The requested range; missing or unparseable ends fall back to the
    /// default window ending today.
    #[must_use]
    pub fn range(&self, today: NaiveDate) -> DateRange {
        let parse = |v: &Option<String>| {
            v.as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
        };
        let default = DateRange::last_days(today, DEFAULT_DAYS);
        match (parse(&self.from), parse(&self.to)) {
            (Some(from), Some(to)) => DateRange::new(from, to),
            (Some(from), None) => DateRange::new(from, today),
            (None, Some(to)) => DateRange::last_days(to, DEFAULT_DAYS),
            (None, None) => default,
        }
    }

    #[must_use]
    pub fn group_by(&self) -> GroupBy {
        self.group_by
            .as_deref()
            .and_then(GroupBy::parse)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Quote a CSV field when it contains a delimiter, quote or line break.
///
const FORMULA_PREFIXES: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

/// Fields starting with a formula character are prefixed with `'` so
/// spreadsheets treat them as text. A leading tab or carriage return
/// counts as one.
#[must_use]
pub fn csv_escape(field: &str) -> String {
    let field = if field.starts_with(FORMULA_PREFIXES) && field.parse::<Decimal>().is_err() {
        format!("'{field}")
    } else {
        field.to_string()
    };
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

/// Build a CSV document with CRLF line endings.
#[must_use]
pub fn to_csv(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    let mut push_row = |cells: &mut dyn Iterator<Item = String>| {
        let line: Vec<String> = cells.map(|c| csv_escape(&c)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    };
    push_row(&mut header.iter().map(|h| (*h).to_string()));
    for row in rows {
        push_row(&mut row.iter().cloned());
    }
    out
}

fn csv_response(name: &str, range: DateRange, body: String) -> Response {
    let filename = format!(
        "{name}-{}-{}.csv",
        range.from.format(DATE_FORMAT),
        range.to.format(DATE_FORMAT)
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        // BOM so spreadsheet apps read Vietnamese text as UTF-8.
        format!("\u{feff}{body}"),
    )
        .into_response()
}

// =============================================================================
// Shared view data
// =============================================================================

/// Range form values and the matching CSV link.
#[derive(Debug, Clone)]
pub struct RangeView {
    pub from: String,
    pub to: String,
    pub csv_href: String,
}

impl RangeView {
    fn new(path: &str, range: DateRange, group_by: Option<GroupBy>) -> Self {
        let from = range.from.format(DATE_FORMAT).to_string();
        let to = range.to.format(DATE_FORMAT).to_string();
        let group = group_by
            .map(|g| format!("&group_by={}", g.as_str()))
            .unwrap_or_default();
        Self {
            csv_href: format!("{path}?from={from}&to={to}{group}&format=csv"),
            from,
            to,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone)]
pub struct SalesRowView {
    pub period: String,
    pub orders: u64,
    pub revenue: String,
    pub discount: String,
    pub average: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "reports/sales.html")]
pub struct SalesTemplate {
    pub page: AdminPage,
    pub range: RangeView,
    pub groups: Vec<GroupOption>,
    pub rows: Vec<SalesRowView>,
    pub total_revenue: String,
    pub total_orders: u64,
}

fn sales_csv(report: &SalesReport) -> String {
    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|r| {
            vec![
                r.period.clone(),
                r.orders.to_string(),
                r.revenue.to_string(),
                r.discount.to_string(),
                r.average_order_value.round_dp(2).to_string(),
            ]
        })
        .collect();
    to_csv(
        &["period", "orders", "revenue", "discount", "average_order_value"],
        &rows,
    )
}

#[instrument(skip(state, auth, page))]
pub async fn sales(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let range = query.range(shop_date(&Utc::now()));
    let group_by = query.group_by();
    let report = state.api().sales_report(range, group_by, &auth).await?;

    if query.wants_csv() {
        return Ok(csv_response("sales", range, sales_csv(&report)));
    }

    let locale = state.locale();
    let currency = report.currency;
    let fmt = |amount: Decimal| money(amount, currency, locale);
    Ok(SalesTemplate {
        page,
        range: RangeView::new("/reports/sales", range, Some(group_by)),
        groups: GroupBy::ALL
            .into_iter()
            .map(|g| GroupOption {
                value: g.as_str(),
                label: match g {
                    GroupBy::Day => "Day",
                    GroupBy::Week => "Week",
                    GroupBy::Month => "Month",
                },
                selected: g == group_by,
            })
            .collect(),
        rows: report
            .rows
            .iter()
            .map(|r| SalesRowView {
                period: r.period.clone(),
                orders: r.orders,
                revenue: fmt(r.revenue),
                discount: fmt(r.discount),
                average: fmt(r.average_order_value),
            })
            .collect(),
        total_revenue: fmt(report.total_revenue),
        total_orders: report.total_orders,
    }
    .into_response())
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone)]
pub struct ProductReportView {
    pub name: String,
    pub href: String,
    pub quantity_sold: u64,
    pub revenue: String,
    pub stock: i64,
    pub low_stock: bool,
}

/// Stock at or below this is highlighted.
const LOW_STOCK: i64 = 5;

#[derive(Template, WebTemplate)]
#[template(path = "reports/products.html")]
pub struct ProductReportTemplate {
    pub page: AdminPage,
    pub range: RangeView,
    pub rows: Vec<ProductReportView>,
}

fn products_csv(rows: &[ProductReportRow]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.product_id.to_string(),
                r.name.clone(),
                r.quantity_sold.to_string(),
                r.revenue.to_string(),
                r.stock.to_string(),
            ]
        })
        .collect();
    to_csv(
        &["product_id", "name", "quantity_sold", "revenue", "stock"],
        &rows,
    )
}

#[instrument(skip(state, auth, page))]
pub async fn products(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let range = query.range(shop_date(&Utc::now()));
    let rows = state.api().product_report(range, &auth).await?;

    if query.wants_csv() {
        return Ok(csv_response("products", range, products_csv(&rows)));
    }

    let locale = state.locale();
    Ok(ProductReportTemplate {
        page,
        range: RangeView::new("/reports/products", range, None),
        rows: rows
            .iter()
            .map(|r| ProductReportView {
                name: r.name.clone(),
                href: format!("/products/{}/edit", r.product_id),
                quantity_sold: r.quantity_sold,
                revenue: money(r.revenue, CurrencyCode::default(), locale),
                stock: r.stock,
                low_stock: r.stock <= LOW_STOCK,
            })
            .collect(),
    }
    .into_response())
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerReportView {
    pub name: String,
    pub email: String,
    pub href: String,
    pub orders: u64,
    pub total_spent: String,
    pub last_order_at: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "reports/customers.html")]
pub struct CustomerReportTemplate {
    pub page: AdminPage,
    pub range: RangeView,
    pub rows: Vec<CustomerReportView>,
}

fn customers_csv(rows: &[CustomerReportRow]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.user_id.to_string(),
                r.name.clone(),
                r.email.clone(),
                r.orders.to_string(),
                r.total_spent.to_string(),
                r.last_order_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    to_csv(
        &["user_id", "name", "email", "orders", "total_spent", "last_order_at"],
        &rows,
    )
}

fn customer_view(row: &CustomerReportRow, locale: Locale) -> CustomerReportView {
    CustomerReportView {
        name: row.name.clone(),
        email: row.email.clone(),
        href: format!("/users/{}", row.user_id),
        orders: row.orders,
        total_spent: money(row.total_spent, CurrencyCode::default(), locale),
        last_order_at: row
            .last_order_at
            .as_ref()
            .map(|at| format_naive(at, locale))
            .unwrap_or_default(),
    }
}

#[instrument(skip(state, auth, page))]
pub async fn customers(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let range = query.range(shop_date(&Utc::now()));
    let rows = state.api().customer_report(range, &auth).await?;

    if query.wants_csv() {
        return Ok(csv_response("customers", range, customers_csv(&rows)));
    }

    let locale = state.locale();
    Ok(CustomerReportTemplate {
        page,
        range: RangeView::new("/reports/customers", range, None),
        rows: rows.iter().map(|r| customer_view(r, locale)).collect(),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sapa_api::types::SalesRow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("Áo thun"), "Áo thun");
        assert_eq!(csv_escape("Nón, mũ"), "\"Nón, mũ\"");
        assert_eq!(csv_escape("size \"L\""), "\"size \"\"L\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_escape("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(csv_escape("-12.5"), "-12.5");
        assert_eq!(csv_escape("\t=1+2"), "'\t=1+2");
        assert_eq!(csv_escape("\r=1+2"), "\"'\r=1+2\"");
    }

    #[test]
    fn test_to_csv_uses_crlf() {
        let csv = to_csv(&["a", "b"], &[vec!["1".to_string(), "x,y".to_string()]]);
        assert_eq!(csv, "a,b\r\n1,\"x,y\"\r\n");
    }

    #[test]
    fn test_range_defaults_and_swaps() {
        let today = date(2026, 5, 31);
        let query = ReportQuery::default();
        assert_eq!(query.range(today), DateRange::new(date(2026, 5, 2), today));

        let query = ReportQuery {
            from: Some("2026-05-20".to_string()),
            to: Some("2026-05-01".to_string()),
            ..ReportQuery::default()
        };
        let range = query.range(today);
        assert_eq!((range.from, range.to), (date(2026, 5, 1), date(2026, 5, 20)));

        let query = ReportQuery {
            from: Some("garbage".to_string()),
            ..ReportQuery::default()
        };
        assert_eq!(query.range(today).to, today);
    }

    #[test]
    fn test_group_by_falls_back_to_day() {
        let query = ReportQuery {
            group_by: Some("quarter".to_string()),
            ..ReportQuery::default()
        };
        assert_eq!(query.group_by(), GroupBy::Day);
        let query = ReportQuery {
            group_by: Some("month".to_string()),
            format: Some("csv".to_string()),
            ..ReportQuery::default()
        };
        assert_eq!(query.group_by(), GroupBy::Month);
        assert!(query.wants_csv());
    }

    #[test]
    fn test_sales_csv() {
        let report = SalesReport {
            rows: vec![SalesRow {
                period: "2026-05-01".to_string(),
                orders: 3,
                revenue: Decimal::new(450_000, 0),
                discount: Decimal::new(20_000, 0),
                average_order_value: Decimal::new(150_000, 0),
            }],
            ..SalesReport::default()
        };
        let csv = sales_csv(&report);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("period,orders,revenue,discount,average_order_value")
        );
        assert_eq!(lines.next(), Some("2026-05-01,3,450000,20000,150000"));
    }

    #[test]
    fn test_csv_href_keeps_filters() {
        let range = DateRange::new(date(2026, 5, 1), date(2026, 5, 31));
        let view = RangeView::new("/reports/sales", range, Some(GroupBy::Week));
        assert_eq!(
            view.csv_href,
            "/reports/sales?from=2026-05-01&to=2026-05-31&group_by=week&format=csv"
        );
    }
}
