//! Coupons, reviews and notifications.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sapa_core::{CouponId, CouponKind, NotificationId, NotificationKind, PageRequest, ProductId, ReviewId};
use serde::{Deserialize, Serialize};

/// A discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: Decimal,
    #[serde(default)]
    pub min_order_value: Option<Decimal>,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

impl Coupon {
    /// Active, started, not ended and under its usage limit.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now < end)
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }
}

/// Body for creating or updating a coupon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Result of `GET /coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponValidation {
    pub code: String,
    pub valid: bool,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

/// A product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub user_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

/// Body for `POST /products/{id}/reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewInput {
    pub rating: u8,
    pub comment: String,
}

impl ReviewInput {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    /// Whether the rating is within 1..=5.
    #[must_use]
    pub const fn has_valid_rating(&self) -> bool {
        self.rating >= Self::MIN_RATING && self.rating <= Self::MAX_RATING
    }
}

/// Admin filters for `GET /reviews`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQuery {
    pub page: PageRequest,
    pub product_id: Option<ProductId>,
    pub visible: Option<bool>,
}

impl ReviewQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.page.to_string()),
            ("limit", self.page.limit.to_string()),
        ];
        if let Some(product_id) = &self.product_id {
            pairs.push(("productId", product_id.to_string()));
        }
        if let Some(visible) = self.visible {
            pairs.push(("visible", visible.to_string()));
        }
        pairs
    }
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of `GET /notifications/unread-count`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct UnreadCount {
    pub count: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon() -> Coupon {
        serde_json::from_str(
            r#"{"id":"c1","code":"TET2026","type":"PERCENTAGE","value":"10","isActive":true,"usageLimit":2,"usedCount":1}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_coupon_usable() {
        let now = Utc::now();
        let mut c = coupon();
        assert!(c.is_usable_at(now));

        c.used_count = 2;
        assert!(!c.is_usable_at(now));

        let mut c = coupon();
        c.ends_at = Some(now - Duration::hours(1));
        assert!(!c.is_usable_at(now));

        let mut c = coupon();
        c.starts_at = Some(now + Duration::hours(1));
        assert!(!c.is_usable_at(now));
    }

    #[test]
    fn test_review_rating_bounds() {
        let review = |rating| ReviewInput {
            rating,
            comment: String::new(),
        };
        assert!(review(1).has_valid_rating());
        assert!(review(5).has_valid_rating());
        assert!(!review(0).has_valid_rating());
        assert!(!review(6).has_valid_rating());
    }

    #[test]
    fn test_notification_kind_from_type_field() {
        let n: Notification = serde_json::from_str(
            r#"{"id":"n1","type":"ORDER","title":"Đơn hàng đã giao","createdAt":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Order);
        assert!(!n.is_read);
    }
}
