//! Display-ready view models.
//!
//! API types carry raw decimals, enums and UTC timestamps. Templates get
//! these structs instead, with every price, date and label already
//! rendered for the request locale.

use chrono::{DateTime, FixedOffset, Utc};
use sapa_api::types::{
    Address, Cart, CartItem, Category, Notification, Order, OrderItem, Product, Review,
    WishlistItem,
};
use sapa_core::{Locale, Money, OrderStatus, PaymentMethod};

use crate::i18n::{I18n, localized_path};

/// Shop-local display time (ICT, UTC+7).
const DISPLAY_OFFSET_SECS: i32 = 7 * 3600;

/// Render a timestamp in shop-local time, in the locale's date order.
#[must_use]
pub fn format_datetime(at: &DateTime<Utc>, locale: Locale) -> String {
    let local = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)
        .map_or_else(|| at.naive_utc(), |offset| at.with_timezone(&offset).naive_local());
    match locale {
        Locale::Vi => local.format("%d/%m/%Y %H:%M").to_string(),
        Locale::En => local.format("%b %-d, %Y %H:%M").to_string(),
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

// =============================================================================
// Catalog
// =============================================================================

/// A product tile on listing pages.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub href: String,
    /// Localized `/wishlist/{id}`; append `/remove` to unsave.
    pub wishlist_href: String,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub price: String,
    pub compare_at: Option<String>,
    pub in_stock: bool,
    pub rating: Option<f64>,
    pub review_count: u32,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, locale: Locale) -> Self {
        let image = product.featured_image();
        Self {
            id: product.id.to_string(),
            slug: product.slug.clone(),
            name: product.name.clone(),
            href: localized_path(locale, &format!("/products/{}", product.slug)),
            wishlist_href: localized_path(locale, &format!("/wishlist/{}", product.id)),
            image_url: image.map(|i| i.url.clone()),
            image_alt: image
                .and_then(|i| i.alt.clone())
                .unwrap_or_else(|| product.name.clone()),
            price: product.price_money().format(locale),
            compare_at: product.compare_at_money().map(|m| m.format(locale)),
            in_stock: product.in_stock(),
            rating: product.average_rating,
            review_count: product.review_count,
        }
    }
}

/// A purchasable variant on the product page.
#[derive(Debug, Clone)]
pub struct VariantView {
    pub id: String,
    pub label: String,
    pub in_stock: bool,
}

/// A gallery image.
#[derive(Debug, Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

/// Everything the product detail page shows about the product itself.
#[derive(Debug, Clone)]
pub struct ProductDetailView {
    pub card: ProductCardView,
    pub description: Option<String>,
    pub images: Vec<ImageView>,
    pub variants: Vec<VariantView>,
    pub attributes: Vec<(String, String)>,
    pub category_name: Option<String>,
    pub category_href: Option<String>,
}

impl ProductDetailView {
    #[must_use]
    pub fn new(product: &Product, locale: Locale) -> Self {
        let currency = product.currency;
        Self {
            card: ProductCardView::new(product, locale),
            description: product.description.clone(),
            images: product
                .images
                .iter()
                .map(|i| ImageView {
                    url: i.url.clone(),
                    alt: i.alt.clone().unwrap_or_else(|| product.name.clone()),
                })
                .collect(),
            variants: product
                .variants
                .iter()
                .map(|v| VariantView {
                    id: v.id.to_string(),
                    label: format!(
                        "{} ({})",
                        v.name,
                        Money::new(v.price, currency).format(locale)
                    ),
                    in_stock: v.in_stock(),
                })
                .collect(),
            attributes: product
                .attributes
                .iter()
                .map(|a| (a.name.clone(), a.values.join(", ")))
                .collect(),
            category_name: product.category.as_ref().map(|c| c.name.clone()),
            category_href: product
                .category
                .as_ref()
                .map(|c| localized_path(locale, &format!("/categories/{}", c.slug))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryView {
    pub slug: String,
    pub name: String,
    pub href: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub product_count: Option<u32>,
}

impl CategoryView {
    #[must_use]
    pub fn new(category: &Category, locale: Locale) -> Self {
        Self {
            slug: category.slug.clone(),
            name: category.name.clone(),
            href: localized_path(locale, &format!("/categories/{}", category.slug)),
            description: category.description.clone(),
            image: category.image.clone(),
            product_count: category.product_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewView {
    pub author: String,
    pub rating: u8,
    pub comment: String,
    pub date: String,
}

impl ReviewView {
    #[must_use]
    pub fn new(review: &Review, locale: Locale) -> Self {
        Self {
            author: review.user_name.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            date: format_datetime(&review.created_at, locale),
        }
    }
}

// =============================================================================
// Cart and wishlist
// =============================================================================

#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: String,
    pub href: String,
    pub name: String,
    pub variant_name: Option<String>,
    pub image: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub max_quantity: u32,
    pub line_total: String,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping_fee: String,
    pub total: String,
    pub coupon_code: Option<String>,
}

/// Upper bound for the quantity input when the API gives none.
const DEFAULT_MAX_QUANTITY: u32 = 99;

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, locale: Locale) -> Self {
        let fmt = |amount| cart.money(amount).format(locale);
        Self {
            items: cart
                .items
                .iter()
                .map(|item: &CartItem| CartItemView {
                    id: item.id.to_string(),
                    href: localized_path(locale, &format!("/products/{}", item.slug)),
                    name: item.name.clone(),
                    variant_name: item.variant_name.clone(),
                    image: item.image.clone(),
                    unit_price: fmt(item.unit_price),
                    quantity: item.quantity,
                    max_quantity: item.max_quantity.unwrap_or(DEFAULT_MAX_QUANTITY),
                    line_total: fmt(item.line_total),
                })
                .collect(),
            item_count: cart.item_count(),
            subtotal: fmt(cart.subtotal),
            discount: (!cart.discount.is_zero()).then(|| fmt(-cart.discount)),
            shipping_fee: fmt(cart.shipping_fee),
            total: fmt(cart.total),
            coupon_code: cart.coupon.as_ref().map(|c| c.code.clone()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WishlistItemView {
    pub product: ProductCardView,
    pub added_at: Option<String>,
}

impl WishlistItemView {
    #[must_use]
    pub fn new(item: &WishlistItem, locale: Locale) -> Self {
        Self {
            product: ProductCardView::new(&item.product, locale),
            added_at: item.added_at.as_ref().map(|at| format_datetime(at, locale)),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A row in the order history.
#[derive(Debug, Clone)]
pub struct OrderSummaryView {
    pub number: String,
    pub href: String,
    pub status_label: String,
    pub status_class: &'static str,
    pub total: String,
    pub item_count: u32,
    pub placed_at: String,
}

impl OrderSummaryView {
    #[must_use]
    pub fn new(order: &Order, i18n: &I18n) -> Self {
        let locale = i18n.locale();
        Self {
            number: order.order_number.clone(),
            href: localized_path(locale, &format!("/orders/{}", order.id)),
            status_label: i18n.t(order.status.label_key()).to_string(),
            status_class: status_class(order.status),
            total: order.money(order.total).format(locale),
            item_count: order.item_count(),
            placed_at: format_datetime(&order.created_at, locale),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub href: Option<String>,
    pub variant_name: Option<String>,
    pub image: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

#[derive(Debug, Clone)]
pub struct HistoryEntryView {
    pub label: String,
    pub note: Option<String>,
    pub at: String,
}

/// The order detail page, shared with the checkout success page.
#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub summary: OrderSummaryView,
    pub id: String,
    pub payment_method: String,
    pub payment_status: String,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping_fee: String,
    pub coupon_code: Option<String>,
    pub shipping_address: Option<String>,
    pub recipient: Option<String>,
    pub note: Option<String>,
    pub history: Vec<HistoryEntryView>,
    pub can_request_cancellation: bool,
    pub can_request_refund: bool,
}

impl OrderDetailView {
    #[must_use]
    pub fn new(order: &Order, i18n: &I18n) -> Self {
        let locale = i18n.locale();
        let fmt = |amount| order.money(amount).format(locale);
        Self {
            summary: OrderSummaryView::new(order, i18n),
            id: order.id.to_string(),
            payment_method: i18n.t(order.payment_method.label_key()).to_string(),
            payment_status: i18n.t(order.payment_status.label_key()).to_string(),
            lines: order
                .items
                .iter()
                .map(|item: &OrderItem| OrderLineView {
                    name: item.name.clone(),
                    href: item
                        .slug
                        .as_ref()
                        .map(|slug| localized_path(locale, &format!("/products/{slug}"))),
                    variant_name: item.variant_name.clone(),
                    image: item.image.clone(),
                    unit_price: fmt(item.unit_price),
                    quantity: item.quantity,
                    line_total: fmt(item.line_total),
                })
                .collect(),
            subtotal: fmt(order.subtotal),
            discount: (!order.discount.is_zero()).then(|| fmt(-order.discount)),
            shipping_fee: fmt(order.shipping_fee),
            coupon_code: order.coupon_code.clone(),
            shipping_address: order.shipping_address.as_ref().map(Address::one_line),
            recipient: order
                .shipping_address
                .as_ref()
                .map(|a| format!("{} · {}", a.full_name, a.phone)),
            note: order.note.clone(),
            history: order
                .history
                .iter()
                .map(|change| HistoryEntryView {
                    label: i18n.t(change.status.label_key()).to_string(),
                    note: change.note.clone(),
                    at: format_datetime(&change.changed_at, locale),
                })
                .collect(),
            can_request_cancellation: order.status.customer_can_request_cancellation(),
            can_request_refund: order.status.customer_can_request_refund(),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

#[derive(Debug, Clone)]
pub struct AddressView {
    pub id: String,
    pub recipient: String,
    pub phone: String,
    pub line: String,
    pub is_default: bool,
    pub edit_href: String,
}

impl AddressView {
    #[must_use]
    pub fn new(address: &Address, locale: Locale) -> Self {
        let id = address
            .id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Self {
            edit_href: localized_path(locale, &format!("/account/addresses/{id}/edit")),
            id,
            recipient: address.full_name.clone(),
            phone: address.phone.clone(),
            line: address.one_line(),
            is_default: address.is_default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationView {
    pub id: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub at: String,
}

impl NotificationView {
    #[must_use]
    pub fn new(notification: &Notification, locale: Locale) -> Self {
        Self {
            id: notification.id.to_string(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            link: notification.link.as_deref().map(|link| {
                if link.starts_with('/') {
                    localized_path(locale, link)
                } else {
                    link.to_string()
                }
            }),
            is_read: notification.is_read,
            at: format_datetime(&notification.created_at, locale),
        }
    }
}

/// A payment choice on the checkout form.
#[derive(Debug, Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: String,
}

#[must_use]
pub fn payment_options(i18n: &I18n) -> Vec<PaymentOption> {
    PaymentMethod::ALL
        .iter()
        .map(|m| PaymentOption {
            value: m.as_str(),
            label: i18n.t(m.label_key()).to_string(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_is_shown_in_shop_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 0).unwrap();
        assert_eq!(format_datetime(&at, Locale::Vi), "02/03/2026 03:30");
        assert_eq!(format_datetime(&at, Locale::En), "Mar 2, 2026 03:30");
    }

    #[test]
    fn test_order_detail_offers_only_legal_requests() {
        let json = r#"{
            "id": "o1", "orderNumber": "SP-1001", "status": "DELIVERED",
            "paymentStatus": "PAID", "paymentMethod": "COD",
            "items": [{"productId":"p1","name":"Áo","slug":"ao","unitPrice":"100000","quantity":2,"lineTotal":"200000"}],
            "subtotal": "200000", "discount": "20000", "shippingFee": "30000", "total": "210000",
            "createdAt": "2026-03-01T08:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        let view = OrderDetailView::new(&order, &I18n::for_locale(Locale::Vi));
        assert!(view.can_request_refund);
        assert!(!view.can_request_cancellation);
        assert_eq!(view.summary.total, "210.000 ₫");
        assert_eq!(view.discount.as_deref(), Some("-20.000 ₫"));
        assert_eq!(view.lines[0].href.as_deref(), Some("/vi/products/ao"));
        assert_eq!(view.summary.href, "/vi/orders/o1");
    }

    #[test]
    fn test_cart_view_formats_totals() {
        let json = r#"{
            "items": [{"id":"c1","productId":"p1","name":"Áo","slug":"ao","unitPrice":"125000","quantity":2,"lineTotal":"250000"}],
            "subtotal": "250000", "total": "250000", "currency": "VND"
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        let view = CartView::new(&cart, Locale::En);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total, "250,000 ₫");
        assert_eq!(view.discount, None);
        assert_eq!(view.items[0].max_quantity, DEFAULT_MAX_QUANTITY);
    }

    #[test]
    fn test_status_class_groups_requests() {
        assert_eq!(
            status_class(OrderStatus::RefundRequested),
            status_class(OrderStatus::CancellationRequested)
        );
        assert_ne!(
            status_class(OrderStatus::Pending),
            status_class(OrderStatus::Delivered)
        );
    }
}
