use chrono::{DateTime, Utc};
use glow_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::checkout::CheckoutQuote;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses in which the order's stock has been taken off the shelf.
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "CASH_ON_DELIVERY",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH_ON_DELIVERY" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            other => Err(OrderError::UnknownPaymentStatus(other.to_string())),
        }
    }
}

/// Where and to whom a cash-on-delivery parcel goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingDetails {
    pub full_name: String,
    pub phone: Masked<String>,
    pub address_line: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

impl ShippingDetails {
    pub fn validate(&self) -> Result<(), OrderError> {
        let required = [
            ("full name", self.full_name.as_str()),
            ("phone", self.phone.inner().as_str()),
            ("address", self.address_line.as_str()),
            ("city", self.city.as_str()),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(OrderError::MissingShippingField(*field)),
            None => Ok(()),
        }
    }
}

/// A placed order. Totals are frozen at creation; only `status` moves afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    /// `None` is a legacy order whose price included delivery, `Some(0)` is free delivery.
    pub shipping_fee_cents: Option<i64>,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping: ShippingDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a pending cash-on-delivery order from a server-side quote.
    pub fn place(user_id: Uuid, quote: &CheckoutQuote, shipping: ShippingDetails) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let items = quote
            .lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id: id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
            })
            .collect();

        Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            items,
            subtotal_cents: quote.subtotal_cents,
            shipping_fee_cents: Some(quote.shipping_fee_cents),
            total_cents: quote.total_cents,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            shipping,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().fold(0, |count, item| count.saturating_add(item.quantity))
    }

    /// Sum of the captured line totals.
    pub fn items_total_cents(&self) -> i64 {
        self.items
            .iter()
            .fold(0, |total, item| total.saturating_add(item.line_total_cents()))
    }

    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}

/// A line of a placed order, priced at the moment of checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl OrderItem {
    /// Saturates; checkout already rejected lines whose total overflows.
    pub fn line_total_cents(&self) -> i64 {
        glow_catalog::line_total(self.unit_price_cents, self.quantity).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Quantity must be positive for product {0}")]
    InvalidQuantity(Uuid),

    #[error("Quantity {quantity} is out of range for product {product_id}")]
    QuantityOutOfRange { product_id: Uuid, quantity: i64 },

    #[error("Order amount is too large")]
    AmountOverflow,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("None of the requested products are available")]
    NoAvailableItems,

    #[error("Shipping {0} is required")]
    MissingShippingField(&'static str),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Unknown payment status: {0}")]
    UnknownPaymentStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committed_statuses() {
        let committed: Vec<_> = OrderStatus::ALL.into_iter().filter(OrderStatus::is_committed).collect();
        assert_eq!(
            committed,
            vec![OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered]
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("SHIPPED".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(" cancelled ".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!(matches!(
            "REFUNDED".parse::<OrderStatus>(),
            Err(OrderError::UnknownStatus(s)) if s == "REFUNDED"
        ));
    }

    #[test]
    fn test_shipping_details_validation() {
        let mut details = ShippingDetails {
            full_name: "Salma B.".to_string(),
            phone: Masked("+212600000001".to_string()),
            address_line: "12 Avenue Mohammed V".to_string(),
            city: "Rabat".to_string(),
            postal_code: None,
            notes: None,
        };
        assert!(details.validate().is_ok());

        details.city = "  ".to_string();
        assert!(matches!(details.validate(), Err(OrderError::MissingShippingField("city"))));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap(),
            "\"CASH_ON_DELIVERY\""
        );
    }
}
