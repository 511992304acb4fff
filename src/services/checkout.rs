use serde::Deserialize;
use serde_json::{json, Value};

use super::razorpay::{
    to_minor_units, verify_payment_signature, GatewayOrder, GatewayOrderRequest, PaymentGateway,
};
use crate::config::StatusPolicy;
use crate::error::{AppError, FieldError, Result};
use crate::models::{
    new_id, now, Order, OrderPayload, OrderStatus, PaymentMethod, PaymentResultInput, User,
};
use crate::store::{Store, StoreResult};

fn default_currency() -> String {
    "INR".to_string()
}

fn default_receipt() -> String {
    "order_receipt".to_string()
}

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_receipt")]
    pub receipt: String,
    #[serde(default)]
    pub notes: Option<Value>,
}

/// What the checkout widget hands back after a completed payment, plus the
/// cart the storefront assembled before opening it.
#[derive(Debug, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    #[serde(default, rename = "orderData")]
    pub order_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    OrderCreated { order_id: String, payment_id: String },
    SignatureMismatch,
    ValidationFailed(Vec<FieldError>),
}

/// Creates the gateway order the checkout widget pays against.
pub async fn initiate_payment(
    gateway: &dyn PaymentGateway,
    request: InitiatePaymentRequest,
) -> Result<GatewayOrder> {
    let minor = request
        .amount
        .and_then(to_minor_units)
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(
                "amount",
                "Please provide a valid amount",
            )])
        })?;

    let order = gateway
        .create_order(&GatewayOrderRequest {
            amount: minor,
            currency: request.currency,
            receipt: request.receipt,
            notes: request.notes.unwrap_or_else(|| json!({})),
        })
        .await?;

    Ok(order)
}

/// Checks the gateway signature and, only when it matches, persists the paid
/// order and takes its items out of stock.
///
/// The order insert and the per-product stock updates are separate writes. A
/// failure part way leaves the order in place with some items not decremented.
pub async fn verify_and_materialize(
    store: &dyn Store,
    secret: &str,
    confirmation: PaymentConfirmation,
    buyer: Option<&User>,
) -> StoreResult<VerificationOutcome> {
    let PaymentConfirmation {
        razorpay_order_id: order_id,
        razorpay_payment_id: payment_id,
        razorpay_signature: signature,
        order_data,
    } = confirmation;

    if !verify_payment_signature(secret, &order_id, &payment_id, &signature) {
        log::warn!(
            "Rejected payment signature for gateway order {} / payment {}",
            order_id,
            payment_id
        );
        return Ok(VerificationOutcome::SignatureMismatch);
    }

    let mut raw = match order_data {
        Some(raw) if !raw.is_null() => raw,
        _ => {
            return Ok(VerificationOutcome::ValidationFailed(vec![FieldError::new(
                "orderData",
                "Order data is required",
            )]))
        }
    };
    if let Some(fields) = raw.as_object_mut() {
        fields.insert("paymentMethod".to_string(), json!("razorpay"));
    }

    let payload: OrderPayload = match serde_json::from_value(raw) {
        Ok(payload) => payload,
        Err(e) => {
            return Ok(VerificationOutcome::ValidationFailed(vec![FieldError::new(
                "orderData",
                format!("Invalid order data: {}", e),
            )]))
        }
    };
    if let Err(errors) = payload.check() {
        return Ok(VerificationOutcome::ValidationFailed(errors));
    }

    let owner = buyer.map(|u| u.id.clone()).or_else(|| payload.user.clone());
    let at = now();
    let mut order = Order::from_payload(new_id(), payload, owner, at);
    order.mark_paid(payment_id.clone(), "completed".to_string(), at);
    store.insert_order(&order).await?;

    log::info!(
        "Order {} materialized from payment {} ({:.2})",
        order.id,
        payment_id,
        order.total_price
    );

    for item in &order.order_items {
        match store.adjust_stock(&item.product, -item.quantity).await {
            Ok(true) => {}
            Ok(false) => log::warn!(
                "Product {} on order {} no longer exists; stock left untouched",
                item.product,
                order.id
            ),
            Err(e) => log::error!(
                "Failed to decrement stock of {} for order {}: {}",
                item.product,
                order.id,
                e
            ),
        }
    }

    Ok(VerificationOutcome::OrderCreated {
        order_id: order.id,
        payment_id,
    })
}

/// Cash-on-delivery checkout. Stock is not touched here; it only moves on
/// gateway-paid orders.
pub async fn place_cod_order(store: &dyn Store, payload: OrderPayload, buyer: &User) -> Result<Order> {
    if payload.payment_method != PaymentMethod::Cod {
        return Err(AppError::Validation(vec![FieldError::new(
            "paymentMethod",
            "Online payments must go through payment verification",
        )]));
    }
    payload.check().map_err(AppError::Validation)?;

    let order = Order::from_payload(new_id(), payload, Some(buyer.id.clone()), now());
    store.insert_order(&order).await?;

    log::info!("COD order {} placed by {}", order.id, buyer.id);
    Ok(order)
}

/// Loads an order the viewer may see: their own, or any order for an admin.
pub async fn visible_order(store: &dyn Store, id: &str, viewer: &User) -> Result<Order> {
    let order = store
        .find_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if !viewer.is_admin() && !order.is_owned_by(&viewer.id) {
        return Err(AppError::Forbidden(
            "Not authorized to access this order".to_string(),
        ));
    }
    Ok(order)
}

pub async fn pay_order(
    store: &dyn Store,
    id: &str,
    viewer: &User,
    input: PaymentResultInput,
) -> Result<Order> {
    let mut order = visible_order(store, id, viewer).await?;

    order.mark_paid(
        input.id.unwrap_or_default(),
        input.status.unwrap_or_else(|| "completed".to_string()),
        now(),
    );
    persist(store, &order).await?;

    log::info!("Order {} marked paid", order.id);
    Ok(order)
}

/// Admin status change. Under `StatusPolicy::Permissive` any status may follow
/// any other, so a delivered order can be moved back to pending.
pub async fn update_status(
    store: &dyn Store,
    id: &str,
    status: OrderStatus,
    policy: StatusPolicy,
) -> Result<Order> {
    let mut order = store
        .find_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if policy == StatusPolicy::Strict && !order.status.can_transition_to(status) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {:?} to {:?}",
            order.status, status
        )));
    }

    let previous = order.status;
    order.set_status(status, now());
    persist(store, &order).await?;

    log::info!("Order {} status {:?} -> {:?}", order.id, previous, status);
    Ok(order)
}

async fn persist(store: &dyn Store, order: &Order) -> Result<()> {
    if store.replace_order(order).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Order not found".to_string()))
    }
}
