use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use glow_core::Actor;
use glow_order::{CartLine, Order, OrderError, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingDetails};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLineRequest>,
    pub shipping: ShippingDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub shipping_fee_cents: Option<i64>,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping: ShippingDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order: OrderResponse,
    /// Products that were in the cart but no longer exist.
    pub unavailable_product_ids: Vec<Uuid>,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: item.line_total_cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            items: order.items.iter().map(OrderItemResponse::from).collect(),
            subtotal_cents: order.subtotal_cents,
            shipping_fee_cents: order.shipping_fee_cents,
            total_cents: order.total_cents,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            shipping: order.shipping,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_my_orders).post(create_order))
        .route("/v1/orders/{id}", get(get_order))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Checkout the cart as a pending cash-on-delivery order
pub async fn create_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let lines = req
        .items
        .iter()
        .map(|line| {
            let quantity = u32::try_from(line.quantity).map_err(|_| OrderError::QuantityOutOfRange {
                product_id: line.product_id,
                quantity: line.quantity,
            })?;
            Ok(CartLine { product_id: line.product_id, quantity })
        })
        .collect::<Result<Vec<_>, OrderError>>()?;

    let placed = state.service.create_order(actor.user_id, &lines, req.shipping).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order: placed.order.into(),
            unavailable_product_ids: placed.unavailable,
        }),
    ))
}

/// GET /v1/orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.service.list_my_orders(&actor).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.service.get_order(order_id, &actor).await?;
    Ok(Json(order.into()))
}
