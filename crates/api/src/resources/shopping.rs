//! Cart, wishlist, orders and coupons. Never cached: every read is
//! user-scoped.

use sapa_core::{CartItemId, CouponId, OrderId, OrderStatus, Page, PageRequest, ProductId};
use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::instrument;

use crate::auth::AuthSession;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{
    AddToCart, Cart, CheckoutRequest, Coupon, CouponInput, CouponValidation, Order, OrderQuery,
    OrderRequestReason, StatusUpdate, WishlistItem,
};

#[derive(Serialize)]
struct QuantityBody {
    quantity: u32,
}

#[derive(Serialize)]
struct CodeBody<'a> {
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductBody<'a> {
    product_id: &'a ProductId,
}

impl ApiClient {
    // =========================================================================
    // Cart
    // =========================================================================

    /// The caller's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn get_cart(&self, auth: &AuthSession) -> Result<Cart, ApiError> {
        self.get("/cart", &[], Some(auth)).await
    }

    /// Add a product (or variant) to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` when the requested quantity is not in
    /// stock.
    #[instrument(skip(self, auth), fields(product_id = %item.product_id, quantity = item.quantity))]
    pub async fn add_to_cart(&self, item: &AddToCart, auth: &AuthSession) -> Result<Cart, ApiError> {
        self.post("/cart/items", item, Some(auth)).await
    }

    /// Change a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` when the quantity exceeds stock.
    #[instrument(skip(self, auth), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: &CartItemId,
        quantity: u32,
        auth: &AuthSession,
    ) -> Result<Cart, ApiError> {
        self.patch(
            &format!("/cart/items/{item_id}"),
            &QuantityBody { quantity },
            Some(auth),
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the line is gone.
    #[instrument(skip(self, auth), fields(item_id = %item_id))]
    pub async fn remove_cart_item(
        &self,
        item_id: &CartItemId,
        auth: &AuthSession,
    ) -> Result<Cart, ApiError> {
        self.delete(&format!("/cart/items/{item_id}"), Some(auth))
            .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn clear_cart(&self, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete("/cart", Some(auth)).await?;
        Ok(())
    }

    /// Apply a coupon code to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for unknown, expired or ineligible codes.
    #[instrument(skip(self, auth))]
    pub async fn apply_coupon(&self, code: &str, auth: &AuthSession) -> Result<Cart, ApiError> {
        self.post("/cart/coupon", &CodeBody { code: code.trim() }, Some(auth))
            .await
    }

    /// Remove the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn remove_coupon(&self, auth: &AuthSession) -> Result<Cart, ApiError> {
        self.delete("/cart/coupon", Some(auth)).await
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// The caller's saved products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn get_wishlist(&self, auth: &AuthSession) -> Result<Vec<WishlistItem>, ApiError> {
        self.get("/wishlist", &[], Some(auth)).await
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown products.
    #[instrument(skip(self, auth), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(
        &self,
        product_id: &ProductId,
        auth: &AuthSession,
    ) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .post("/wishlist", &ProductBody { product_id }, Some(auth))
            .await?;
        Ok(())
    }

    /// Remove a saved product. Issues exactly one `DELETE`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it was not saved.
    #[instrument(skip(self, auth), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(
        &self,
        product_id: &ProductId,
        auth: &AuthSession,
    ) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .delete(&format!("/wishlist/{product_id}"), Some(auth))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order from the current cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if stock changed, or
    /// `ApiError::Validation` for an incomplete address.
    #[instrument(skip(self, request, auth), fields(payment_method = ?request.payment_method))]
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
        auth: &AuthSession,
    ) -> Result<Order, ApiError> {
        let order = self.post("/orders", request, Some(auth)).await?;
        // Stock levels changed.
        self.invalidate_products().await;
        Ok(order)
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn my_orders(
        &self,
        page: PageRequest,
        auth: &AuthSession,
    ) -> Result<Page<Order>, ApiError> {
        let query = [
            ("page", page.page.to_string()),
            ("limit", page.limit.to_string()),
        ];
        self.get("/orders/me", &query, Some(auth)).await
    }

    /// One order. Customers can only see their own.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Forbidden`.
    #[instrument(skip(self, auth), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId, auth: &AuthSession) -> Result<Order, ApiError> {
        self.get(&format!("/orders/{id}"), &[], Some(auth)).await
    }

    /// Ask for a pending or processing order to be cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the order can no longer be cancelled.
    #[instrument(skip(self, auth, reason), fields(order_id = %id))]
    pub async fn request_cancellation(
        &self,
        id: &OrderId,
        reason: &str,
        auth: &AuthSession,
    ) -> Result<Order, ApiError> {
        let body = OrderRequestReason {
            reason: reason.trim().to_string(),
        };
        self.post(&format!("/orders/{id}/cancel-request"), &body, Some(auth))
            .await
    }

    /// Ask for a refund of a delivered order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the order is not refundable.
    #[instrument(skip(self, auth, reason), fields(order_id = %id))]
    pub async fn request_refund(
        &self,
        id: &OrderId,
        reason: &str,
        auth: &AuthSession,
    ) -> Result<Order, ApiError> {
        let body = OrderRequestReason {
            reason: reason.trim().to_string(),
        };
        self.post(&format!("/orders/{id}/refund-request"), &body, Some(auth))
            .await
    }

    /// All orders (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth))]
    pub async fn list_orders(
        &self,
        query: &OrderQuery,
        auth: &AuthSession,
    ) -> Result<Page<Order>, ApiError> {
        self.get("/orders", &query.to_pairs(), Some(auth)).await
    }

    /// Move an order to a new status (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` or `ApiError::Validation` if the API
    /// rejects the transition.
    #[instrument(skip(self, auth, note), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        note: Option<String>,
        auth: &AuthSession,
    ) -> Result<Order, ApiError> {
        let body = StatusUpdate { status, note };
        let order = self
            .patch(&format!("/orders/{id}/status"), &body, Some(auth))
            .await?;
        if matches!(status, OrderStatus::Cancelled | OrderStatus::Refunded) {
            // Stock is restored on cancellation and refund.
            self.invalidate_products().await;
        }
        Ok(order)
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Check a code without applying it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn validate_coupon(
        &self,
        code: &str,
        auth: &AuthSession,
    ) -> Result<CouponValidation, ApiError> {
        self.get(
            "/coupons/validate",
            &[("code", code.trim().to_string())],
            Some(auth),
        )
        .await
    }

    /// All coupons (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth))]
    pub async fn list_coupons(
        &self,
        page: PageRequest,
        auth: &AuthSession,
    ) -> Result<Page<Coupon>, ApiError> {
        let query = [
            ("page", page.page.to_string()),
            ("limit", page.limit.to_string()),
        ];
        self.get("/coupons", &query, Some(auth)).await
    }

    /// One coupon (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(coupon_id = %id))]
    pub async fn get_coupon(&self, id: &CouponId, auth: &AuthSession) -> Result<Coupon, ApiError> {
        self.get(&format!("/coupons/{id}"), &[], Some(auth)).await
    }

    /// Create a coupon (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the code is taken.
    #[instrument(skip(self, input, auth), fields(code = %input.code))]
    pub async fn create_coupon(
        &self,
        input: &CouponInput,
        auth: &AuthSession,
    ) -> Result<Coupon, ApiError> {
        self.post("/coupons", input, Some(auth)).await
    }

    /// Update a coupon (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Validation`.
    #[instrument(skip(self, input, auth), fields(coupon_id = %id))]
    pub async fn update_coupon(
        &self,
        id: &CouponId,
        input: &CouponInput,
        auth: &AuthSession,
    ) -> Result<Coupon, ApiError> {
        self.patch(&format!("/coupons/{id}"), input, Some(auth))
            .await
    }

    /// Delete a coupon (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, id: &CouponId, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete(&format!("/coupons/{id}"), Some(auth)).await?;
        Ok(())
    }
}
