//! Orders and checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sapa_core::{
    AddressId, CurrencyCode, Money, OrderId, OrderStatus, PageRequest, PaymentMethod,
    PaymentStatus, ProductId, UserId,
};
use serde::{Deserialize, Serialize};

use super::user::{Address, AddressInput};

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Who placed an order, as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping_fee: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub const fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Body for `POST /orders`.
///
/// Either a saved `address_id` or an inline `shipping_address` is sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<AddressId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressInput>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body for cancellation and refund requests.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequestReason {
    pub reason: String,
}

/// Body for `PATCH /orders/{id}/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Admin filters for `GET /orders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub page: PageRequest,
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
}

impl OrderQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.page.to_string()),
            ("limit", self.page.limit.to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_deserializes() {
        let json = r#"{
            "id": "o1",
            "orderNumber": "SP-1001",
            "status": "REFUND_REQUESTED",
            "paymentStatus": "PAID",
            "paymentMethod": "BANK_TRANSFER",
            "items": [{"productId":"p1","name":"Áo","unitPrice":"100000","quantity":2,"lineTotal":"200000"}],
            "subtotal": "200000",
            "total": "230000",
            "shippingFee": "30000",
            "createdAt": "2026-03-01T08:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::RefundRequested);
        assert_eq!(order.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(order.item_count(), 2);
        assert!(order.history.is_empty());
    }

    #[test]
    fn test_checkout_request_serializes_saved_address() {
        let body = CheckoutRequest {
            address_id: Some(AddressId::new("a1")),
            shipping_address: None,
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            note: Some("Giao giờ hành chính".to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["addressId"], "a1");
        assert_eq!(json["paymentMethod"], "COD");
        assert!(json.get("shippingAddress").is_none());
    }

    #[test]
    fn test_order_query_pairs() {
        let query = OrderQuery {
            page: PageRequest::default(),
            status: Some(OrderStatus::CancellationRequested),
            search: Some(" SP-10 ".to_string()),
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page", "1".to_string()),
                ("limit", "20".to_string()),
                ("status", "CANCELLATION_REQUESTED".to_string()),
                ("search", "SP-10".to_string()),
            ]
        );
    }
}
