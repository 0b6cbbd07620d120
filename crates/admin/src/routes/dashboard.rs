//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sapa_api::ApiError;
use sapa_api::types::{DashboardStats, RevenuePeriod, RevenuePoint, TopProduct};
use sapa_core::{CurrencyCode, Locale};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::page::AdminPage;
use crate::routes::orders::OrderRowView;
use crate::state::AppState;
use crate::views::money;

const TOP_PRODUCTS: u32 = 5;
const RECENT_ORDERS: u32 = 8;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
}

/// A headline number.
#[derive(Debug, Clone)]
pub struct StatCard {
    pub label: &'static str,
    pub value: String,
    pub href: &'static str,
}

/// Choice of revenue window.
#[derive(Debug, Clone)]
pub struct PeriodLink {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// One bar of the revenue chart.
#[derive(Debug, Clone)]
pub struct RevenueBar {
    pub label: String,
    pub revenue: String,
    pub orders: u64,
    /// Height relative to the tallest bar, 0-100.
    pub percent: u32,
}

#[derive(Debug, Clone)]
pub struct TopProductRow {
    pub name: String,
    pub href: String,
    pub quantity_sold: u64,
    pub revenue: String,
}

/// A dashboard panel that may have failed on its own.
#[derive(Debug, Clone)]
pub struct Panel<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Panel<T> {
    /// Keep the page up when one panel fails; an expired login still aborts.
    fn from_result<U>(
        result: std::result::Result<Vec<U>, ApiError>,
        build: impl FnOnce(&[U]) -> Vec<T>,
    ) -> Result<Self> {
        match result {
            Ok(items) => Ok(Self {
                items: build(&items),
                error: None,
            }),
            Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
            Err(e) => {
                tracing::warn!(error = %e, "Dashboard panel failed");
                Ok(Self {
                    items: Vec::new(),
                    error: Some(e.user_message()),
                })
            }
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: AdminPage,
    pub stats: Vec<StatCard>,
    pub periods: Vec<PeriodLink>,
    pub revenue: Panel<RevenueBar>,
    pub top_products: Panel<TopProductRow>,
    pub recent_orders: Panel<OrderRowView>,
}

const fn period_label(period: RevenuePeriod) -> &'static str {
    match period {
        RevenuePeriod::Week => "Last 7 days",
        RevenuePeriod::Month => "Last 30 days",
        RevenuePeriod::Year => "Last 12 months",
    }
}

fn stat_cards(stats: &DashboardStats, locale: Locale) -> Vec<StatCard> {
    vec![
        StatCard {
            label: "Revenue",
            value: money(stats.total_revenue, stats.currency, locale),
            href: "/reports",
        },
        StatCard {
            label: "Orders",
            value: stats.total_orders.to_string(),
            href: "/orders",
        },
        StatCard {
            label: "Pending orders",
            value: stats.pending_orders.to_string(),
            href: "/orders?status=PENDING",
        },
        StatCard {
            label: "Customers",
            value: stats.total_customers.to_string(),
            href: "/users?role=CUSTOMER",
        },
        StatCard {
            label: "Products",
            value: stats.total_products.to_string(),
            href: "/products",
        },
    ]
}

/// Scale the series so the largest bucket is 100.
fn revenue_bars(
    points: &[RevenuePoint],
    currency: CurrencyCode,
    locale: Locale,
) -> Vec<RevenueBar> {
    let max = points
        .iter()
        .map(|p| p.revenue)
        .max()
        .filter(|m| *m > Decimal::ZERO);
    points
        .iter()
        .map(|p| RevenueBar {
            label: p.label.clone(),
            revenue: money(p.revenue, currency, locale),
            orders: p.orders,
            percent: max.map_or(0, |max| {
                (p.revenue.max(Decimal::ZERO) * Decimal::ONE_HUNDRED / max)
                    .round()
                    .to_u32()
                    .unwrap_or(0)
            }),
        })
        .collect()
}

/// Stats, revenue chart, best sellers and latest orders.
#[instrument(skip(state, auth, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let period = query
        .period
        .as_deref()
        .and_then(RevenuePeriod::parse)
        .unwrap_or_default();
    let api = state.api();
    let locale = state.locale();

    let (stats, series, top, recent) = tokio::join!(
        api.dashboard_stats(&auth),
        api.revenue_series(period, &auth),
        api.top_products(TOP_PRODUCTS, &auth),
        api.recent_orders(RECENT_ORDERS, &auth),
    );
    let stats = stats?;
    let currency = stats.currency;

    Ok(DashboardTemplate {
        page,
        stats: stat_cards(&stats, locale),
        periods: RevenuePeriod::ALL
            .into_iter()
            .map(|p| PeriodLink {
                label: period_label(p),
                href: format!("/?period={}", p.as_str()),
                active: p == period,
            })
            .collect(),
        revenue: Panel::from_result(series, |points| revenue_bars(points, currency, locale))?,
        top_products: Panel::from_result(top, |items: &[TopProduct]| {
            items
                .iter()
                .map(|t| TopProductRow {
                    name: t.name.clone(),
                    href: format!("/products/{}/edit", t.product_id),
                    quantity_sold: t.quantity_sold,
                    revenue: money(t.revenue, currency, locale),
                })
                .collect()
        })?,
        recent_orders: Panel::from_result(recent, |orders| {
            orders.iter().map(|o| OrderRowView::new(o, locale)).collect()
        })?,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn point(label: &str, revenue: i64) -> RevenuePoint {
        RevenuePoint {
            label: label.to_string(),
            revenue: Decimal::new(revenue, 0),
            orders: 1,
        }
    }

    #[test]
    fn test_revenue_bars_scale_to_largest() {
        let bars = revenue_bars(
            &[point("T2", 500_000), point("T3", 2_000_000), point("T4", 0)],
            CurrencyCode::VND,
            Locale::Vi,
        );
        let percents: Vec<_> = bars.iter().map(|b| b.percent).collect();
        assert_eq!(percents, vec![25, 100, 0]);
        assert_eq!(bars[1].revenue, "2.000.000 ₫");
    }

    #[test]
    fn test_empty_revenue_has_flat_bars() {
        let bars = revenue_bars(&[point("T2", 0)], CurrencyCode::VND, Locale::En);
        assert_eq!(bars[0].percent, 0);
    }

    #[test]
    fn test_failed_panel_keeps_page() {
        let panel: Panel<TopProductRow> =
            Panel::from_result::<TopProduct>(Err(ApiError::Forbidden), |_| Vec::new()).unwrap();
        assert!(panel.items.is_empty());
        assert!(panel.error.is_some());

        let expired =
            Panel::<TopProductRow>::from_result::<TopProduct>(Err(ApiError::Unauthorized), |_| Vec::new());
        assert!(expired.is_err());
    }

    #[test]
    fn test_stat_cards_format_revenue() {
        let stats = DashboardStats {
            total_revenue: Decimal::new(12_500_000, 0),
            total_orders: 42,
            ..DashboardStats::default()
        };
        let cards = stat_cards(&stats, Locale::En);
        assert_eq!(cards[0].value, "12,500,000 ₫");
        assert_eq!(cards[1].value, "42");
    }
}
