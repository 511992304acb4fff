use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, ProductImage};
use crate::error::FieldError;

/// Money amounts closer than this are treated as equal.
const MONEY_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Razorpay,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Legal moves of the order lifecycle. Re-applying the current status is
    /// always allowed.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        self == next
            || matches!(
                (self, next),
                (Pending, Processing)
                    | (Pending, Cancelled)
                    | (Processing, Shipped)
                    | (Processing, Cancelled)
                    | (Shipped, Delivered)
            )
    }
}

/// Line item snapshot taken at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: String,
    pub name: String,
    pub quantity: i64,
    #[serde(default)]
    pub image: Option<ProductImage>,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items_price: f64,
    pub shipping_price: f64,
    pub tax_price: f64,
    pub total_price: f64,
    pub is_paid: bool,
    #[serde(default, with = "timestamp::option")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_result: Option<PaymentResult>,
    #[serde(default)]
    pub status: OrderStatus,
    pub is_delivered: bool,
    #[serde(default, with = "timestamp::option")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Unpaid, pending order built from a checked payload.
    pub fn from_payload(
        id: String,
        payload: OrderPayload,
        user: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            order_items: payload.order_items,
            shipping_address: payload.shipping_address,
            payment_method: payload.payment_method,
            items_price: payload.items_price,
            shipping_price: payload.shipping_price,
            tax_price: payload.tax_price,
            total_price: payload.total_price,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            status: OrderStatus::Pending,
            is_delivered: false,
            delivered_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn mark_paid(&mut self, payment_id: String, status: String, at: DateTime<Utc>) {
        self.is_paid = true;
        self.paid_at = Some(at);
        self.payment_result = Some(PaymentResult {
            id: payment_id,
            status,
            update_time: at,
        });
        self.updated_at = at;
    }

    /// Stores the status; delivery stamps follow the Delivered state.
    pub fn set_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        if status == OrderStatus::Delivered {
            self.is_delivered = true;
            self.delivered_at = Some(at);
        } else {
            self.is_delivered = false;
            self.delivered_at = None;
        }
        self.updated_at = at;
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user.as_deref() == Some(user_id)
    }
}

/// Order body assembled by the storefront before checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items_price: f64,
    #[serde(default)]
    pub shipping_price: f64,
    #[serde(default)]
    pub tax_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl OrderPayload {
    pub fn subtotal(&self) -> f64 {
        self.order_items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum()
    }

    pub fn expected_total(&self) -> f64 {
        self.subtotal() + self.shipping_price + self.tax_price
    }

    /// Field-level checks, including that the supplied prices add up.
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.order_items.is_empty() {
            errors.push(FieldError::new("orderItems", "No order items"));
        }
        for (idx, item) in self.order_items.iter().enumerate() {
            if item.product.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("orderItems[{}].product", idx),
                    "Product reference is required",
                ));
            }
            if item.quantity < 1 {
                errors.push(FieldError::new(
                    format!("orderItems[{}].quantity", idx),
                    "Quantity must be at least 1",
                ));
            }
            if item.price < 0.0 {
                errors.push(FieldError::new(
                    format!("orderItems[{}].price", idx),
                    "Price cannot be less than 0",
                ));
            }
        }

        if self.shipping_address.address.trim().is_empty() {
            errors.push(FieldError::new(
                "shippingAddress.address",
                "Shipping address is required",
            ));
        }
        if self.shipping_address.city.trim().is_empty() {
            errors.push(FieldError::new("shippingAddress.city", "City is required"));
        }
        if self.shipping_address.pincode.trim().is_empty() {
            errors.push(FieldError::new(
                "shippingAddress.pincode",
                "Pincode is required",
            ));
        }

        if self.shipping_price < 0.0 {
            errors.push(FieldError::new(
                "shippingPrice",
                "Shipping price cannot be less than 0",
            ));
        }
        if self.tax_price < 0.0 {
            errors.push(FieldError::new("taxPrice", "Tax cannot be less than 0"));
        }

        if !same_amount(self.items_price, self.subtotal()) {
            errors.push(FieldError::new(
                "itemsPrice",
                format!("Items price must equal {:.2}", self.subtotal()),
            ));
        }
        if !same_amount(self.total_price, self.expected_total()) {
            errors.push(FieldError::new(
                "totalPrice",
                format!("Total price must equal {:.2}", self.expected_total()),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentResultInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
