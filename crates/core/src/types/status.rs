//! Status enums for orders, payments, users and promotions.
//!
//! The commerce API is the authority on every state change. The transition
//! table below only decides which actions the UI offers, and lets handlers
//! reject an impossible request before it is sent.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who is asking for an order status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// The customer who placed the order.
    Customer,
    /// A back-office operator.
    Admin,
}

/// Error returned when an order status change is not allowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move order from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Order lifecycle status.
///
/// ```text
/// Pending -> Processing -> Shipped -> Delivered -> Refunded
///    |           |                        |
///    +-----------+-> Cancelled            +-> RefundRequested -> Refunded
///    |           |                                     |
///    +-----------+-> CancellationRequested             +-> Delivered (rejected)
///                        |-> Cancelled
///                        +-> Processing (rejected)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    CancellationRequested,
    RefundRequested,
}

impl OrderStatus {
    /// Every status, in lifecycle order. Used for admin filters.
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
        Self::CancellationRequested,
        Self::RefundRequested,
    ];

    /// Statuses an operator may move this order to.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Refunded],
            Self::CancellationRequested => &[Self::Cancelled, Self::Processing],
            Self::RefundRequested => &[Self::Refunded, Self::Delivered],
            Self::Cancelled | Self::Refunded => &[],
        }
    }

    /// Statuses the given actor may move this order to.
    #[must_use]
    pub const fn transitions_for(self, actor: Actor) -> &'static [Self] {
        match actor {
            Actor::Admin => self.allowed_transitions(),
            Actor::Customer => match self {
                Self::Pending | Self::Processing => &[Self::CancellationRequested],
                Self::Delivered => &[Self::RefundRequested],
                _ => &[],
            },
        }
    }

    /// Whether `actor` may move this order to `to`.
    #[must_use]
    pub fn can_transition_to(self, to: Self, actor: Actor) -> bool {
        self.transitions_for(actor).contains(&to)
    }

    /// Validate a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` if the move is not in the table for
    /// `actor`.
    pub fn transition(self, to: Self, actor: Actor) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(to, actor) {
            Ok(to)
        } else {
            Err(StatusTransitionError { from: self, to })
        }
    }

    /// No further changes are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// The customer may ask for this order to be cancelled.
    #[must_use]
    pub const fn customer_can_request_cancellation(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// The customer may ask for a refund.
    #[must_use]
    pub const fn customer_can_request_refund(self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Waiting on an operator decision.
    #[must_use]
    pub const fn needs_attention(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::CancellationRequested | Self::RefundRequested
        )
    }

    /// Stable wire/query-string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
            Self::CancellationRequested => "CANCELLATION_REQUESTED",
            Self::RefundRequested => "REFUND_REQUESTED",
        }
    }

    /// Translation key for the status label, e.g. `order.status.shipped`.
    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::Pending => "order.status.pending",
            Self::Processing => "order.status.processing",
            Self::Shipped => "order.status.shipped",
            Self::Delivered => "order.status.delivered",
            Self::Cancelled => "order.status.cancelled",
            Self::Refunded => "order.status.refunded",
            Self::CancellationRequested => "order.status.cancellation_requested",
            Self::RefundRequested => "order.status.refund_requested",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    /// Translation key for the label.
    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::Unpaid => "payment.status.unpaid",
            Self::Paid => "payment.status.paid",
            Self::Refunded => "payment.status.refunded",
            Self::Failed => "payment.status.failed",
        }
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    BankTransfer,
    Card,
}

impl PaymentMethod {
    pub const ALL: [Self; 3] = [Self::Cod, Self::BankTransfer, Self::Card];

    /// Stable form/wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Card => "CARD",
        }
    }

    /// Translation key for the label.
    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::Cod => "payment.method.cod",
            Self::BankTransfer => "payment.method.bank_transfer",
            Self::Card => "payment.method.card",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid payment method: {s}"))
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "CUSTOMER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Coupon discount type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponKind {
    /// `value` is a percentage of the order subtotal.
    #[default]
    Percentage,
    /// `value` is a fixed amount off.
    Fixed,
}

impl std::str::FromStr for CouponKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(Self::Percentage),
            "FIXED" => Ok(Self::Fixed),
            _ => Err(format!("invalid coupon kind: {s}")),
        }
    }
}

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Order,
    Promotion,
    #[default]
    System,
    Review,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = OrderStatus::Pending
            .transition(OrderStatus::Processing, Actor::Admin)
            .and_then(|s| s.transition(OrderStatus::Shipped, Actor::Admin))
            .and_then(|s| s.transition(OrderStatus::Delivered, Actor::Admin))
            .unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_cannot_skip_states() {
        let err = OrderStatus::Pending
            .transition(OrderStatus::Delivered, Actor::Admin)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Pending);
        assert_eq!(err.to, OrderStatus::Delivered);
        assert_eq!(err.to_string(), "cannot move order from PENDING to DELIVERED");
    }

    #[test]
    fn test_shipped_orders_cannot_be_cancelled() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled, Actor::Admin));
        assert!(!OrderStatus::Shipped.customer_can_request_cancellation());
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for status in OrderStatus::ALL {
            assert_eq!(
                status.is_terminal(),
                status.allowed_transitions().is_empty(),
                "{status}"
            );
        }
    }

    #[test]
    fn test_customer_requests() {
        assert!(
            OrderStatus::Processing
                .can_transition_to(OrderStatus::CancellationRequested, Actor::Customer)
        );
        assert!(
            OrderStatus::Delivered.can_transition_to(OrderStatus::RefundRequested, Actor::Customer)
        );
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled, Actor::Customer));
        assert!(
            !OrderStatus::Shipped.can_transition_to(OrderStatus::RefundRequested, Actor::Customer)
        );
    }

    #[test]
    fn test_operator_resolves_requests() {
        let cancel = OrderStatus::CancellationRequested;
        assert!(cancel.can_transition_to(OrderStatus::Cancelled, Actor::Admin));
        assert!(cancel.can_transition_to(OrderStatus::Processing, Actor::Admin));

        let refund = OrderStatus::RefundRequested;
        assert!(refund.can_transition_to(OrderStatus::Refunded, Actor::Admin));
        assert!(refund.can_transition_to(OrderStatus::Delivered, Actor::Admin));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::CancellationRequested).unwrap();
        assert_eq!(json, "\"CANCELLATION_REQUESTED\"");
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(
            "bank_transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!("paypal".parse::<PaymentMethod>().is_err());
    }
}
