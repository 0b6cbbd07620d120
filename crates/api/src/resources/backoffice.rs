//! Dashboard, reports and settings.

use tracing::{debug, instrument};

use crate::auth::AuthSession;
use crate::cache::{self, CacheValue};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{
    CustomerReportRow, DashboardStats, DateRange, GroupBy, Order, ProductReportRow, RevenuePeriod,
    RevenuePoint, SalesReport, Settings, TopProduct,
};

impl ApiClient {
    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Headline numbers.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip_all)]
    pub async fn dashboard_stats(&self, auth: &AuthSession) -> Result<DashboardStats, ApiError> {
        self.get("/dashboard/stats", &[], Some(auth)).await
    }

    /// Revenue buckets for the chart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth), fields(period = period.as_str()))]
    pub async fn revenue_series(
        &self,
        period: RevenuePeriod,
        auth: &AuthSession,
    ) -> Result<Vec<RevenuePoint>, ApiError> {
        self.get(
            "/dashboard/revenue",
            &[("period", period.as_str().to_string())],
            Some(auth),
        )
        .await
    }

    /// Best sellers.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth))]
    pub async fn top_products(
        &self,
        limit: u32,
        auth: &AuthSession,
    ) -> Result<Vec<TopProduct>, ApiError> {
        self.get(
            "/dashboard/top-products",
            &[("limit", limit.to_string())],
            Some(auth),
        )
        .await
    }

    /// Latest orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth))]
    pub async fn recent_orders(
        &self,
        limit: u32,
        auth: &AuthSession,
    ) -> Result<Vec<Order>, ApiError> {
        self.get(
            "/dashboard/recent-orders",
            &[("limit", limit.to_string())],
            Some(auth),
        )
        .await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Sales grouped by day, week or month.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for an invalid range.
    #[instrument(skip(self, auth), fields(from = %range.from, to = %range.to, group_by = group_by.as_str()))]
    pub async fn sales_report(
        &self,
        range: DateRange,
        group_by: GroupBy,
        auth: &AuthSession,
    ) -> Result<SalesReport, ApiError> {
        let mut query = range.to_pairs();
        query.push(("groupBy", group_by.as_str().to_string()));
        self.get("/reports/sales", &query, Some(auth)).await
    }

    /// Per-product sales.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for an invalid range.
    #[instrument(skip(self, auth), fields(from = %range.from, to = %range.to))]
    pub async fn product_report(
        &self,
        range: DateRange,
        auth: &AuthSession,
    ) -> Result<Vec<ProductReportRow>, ApiError> {
        self.get("/reports/products", &range.to_pairs(), Some(auth))
            .await
    }

    /// Per-customer spend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for an invalid range.
    #[instrument(skip(self, auth), fields(from = %range.from, to = %range.to))]
    pub async fn customer_report(
        &self,
        range: DateRange,
        auth: &AuthSession,
    ) -> Result<Vec<CustomerReportRow>, ApiError> {
        self.get("/reports/customers", &range.to_pairs(), Some(auth))
            .await
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Store settings (cached; public).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_settings(&self) -> Result<Settings, ApiError> {
        let cache_key = cache::settings_key(self.locale());

        if let Some(CacheValue::Settings(settings)) = self.cache_get(&cache_key).await {
            debug!("Cache hit for settings");
            return Ok(*settings);
        }

        let settings: Settings = self.get("/settings", &[], None).await?;
        self.cache_put(cache_key, CacheValue::Settings(Box::new(settings.clone())))
            .await;
        Ok(settings)
    }

    /// Replace store settings (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` on bad input.
    #[instrument(skip_all)]
    pub async fn update_settings(
        &self,
        settings: &Settings,
        auth: &AuthSession,
    ) -> Result<Settings, ApiError> {
        let updated = self.put("/settings", settings, Some(auth)).await?;
        self.invalidate_settings().await;
        Ok(updated)
    }
}
