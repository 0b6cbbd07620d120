//! Cart and wishlist.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sapa_core::{CartItemId, CurrencyCode, Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

use super::catalog::Product;

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub variant_name: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

/// A coupon applied to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Decimal,
}

/// The caller's cart, priced by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub coupon: Option<AppliedCoupon>,
}

impl Cart {
    /// Total number of units, for the header badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency)
    }
}

/// Body for `POST /cart/items`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

/// A saved product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product: Product,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_count_sums_quantities() {
        let json = r#"{
            "items": [
                {"id":"c1","productId":"p1","name":"A","slug":"a","unitPrice":"10","quantity":2,"lineTotal":"20"},
                {"id":"c2","productId":"p2","name":"B","slug":"b","unitPrice":"5","quantity":3,"lineTotal":"15"}
            ],
            "subtotal":"35","total":"35"
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.item_count(), 5);
        assert!(!cart.is_empty());
        assert_eq!(cart.shipping_fee, Decimal::ZERO);
    }

    #[test]
    fn test_add_to_cart_omits_missing_variant() {
        let body = AddToCart {
            product_id: ProductId::new("p1"),
            variant_id: None,
            quantity: 1,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"productId":"p1","quantity":1}"#);
    }
}
