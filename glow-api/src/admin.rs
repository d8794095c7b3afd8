use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use glow_core::Actor;
use glow_order::{InventoryEffect, OrderStatus, StatusChange, TransitionOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::orders::OrderResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StockAdjustmentResponse {
    pub product_id: Uuid,
    pub previous_stock: i32,
    pub delta: i64,
    pub current_stock: i32,
    pub clamped: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub order_id: Uuid,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub inventory_effect: InventoryEffect,
    pub adjustments: Vec<StockAdjustmentResponse>,
    pub skipped_product_ids: Vec<Uuid>,
}

impl From<TransitionOutcome> for StatusUpdateResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            order_id: outcome.order_id,
            from_status: outcome.plan.from,
            to_status: outcome.plan.to,
            inventory_effect: outcome.plan.effect,
            adjustments: outcome
                .applied
                .iter()
                .map(|applied| StockAdjustmentResponse {
                    product_id: applied.product_id,
                    previous_stock: applied.change.previous,
                    delta: applied.change.delta,
                    current_stock: applied.change.current,
                    clamped: applied.change.clamped,
                })
                .collect(),
            skipped_product_ids: outcome.skipped_products,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/orders", get(list_orders))
        .route("/v1/admin/orders/{id}/status", put(update_order_status))
        .route("/v1/admin/orders/{id}/history", get(order_history))
}

fn parse_status(value: &str) -> Result<OrderStatus, AppError> {
    Ok(value.parse::<OrderStatus>()?)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/admin/orders?status=PROCESSING
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let orders = state.service.list_orders(status, &actor).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// PUT /v1/admin/orders/{id}/status
/// Move an order through its lifecycle; stock follows the transition
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let new_status = parse_status(&req.status)?;
    let outcome = state.service.set_order_status(order_id, new_status, &actor).await?;
    Ok(Json(outcome.into()))
}

/// GET /v1/admin/orders/{id}/history
pub async fn order_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<StatusChange>>, AppError> {
    let history = state.service.order_history(order_id, &actor).await?;
    Ok(Json(history))
}
