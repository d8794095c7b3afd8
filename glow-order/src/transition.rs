//! Status transitions and their inventory side effect.
//!
//! Stock leaves the shelf exactly when an order enters a committed status
//! (`PROCESSING`, `SHIPPED`, `DELIVERED`) from a non-committed one, and comes
//! back exactly when it leaves the committed set again. Moving between
//! committed statuses, or between non-committed ones, touches no stock.
//! Stores apply the plan and the status write in one transaction.

use chrono::{DateTime, Utc};
use glow_catalog::StockChange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{OrderItem, OrderStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryEffect {
    None,
    Decrement,
    Restock,
}

impl InventoryEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryEffect::None => "NONE",
            InventoryEffect::Decrement => "DECREMENT",
            InventoryEffect::Restock => "RESTOCK",
        }
    }

    fn sign(&self) -> i64 {
        match self {
            InventoryEffect::None => 0,
            InventoryEffect::Decrement => -1,
            InventoryEffect::Restock => 1,
        }
    }
}

/// Signed stock delta for one product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub delta: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub effect: InventoryEffect,
}

impl TransitionPlan {
    /// Entering a committed status decrements stock and leaving one restocks it.
    /// Moving a committed order back to PENDING restocks like a cancel, so a later recommit decrements once.
    pub fn new(from: OrderStatus, to: OrderStatus) -> Self {
        let effect = if from == to {
            InventoryEffect::None
        } else if !from.is_committed() && to.is_committed() {
            InventoryEffect::Decrement
        } else if from.is_committed() && !to.is_committed() {
            // CANCELLED, or PENDING when an admin reopens a committed order.
            InventoryEffect::Restock
        } else {
            InventoryEffect::None
        };

        Self { from, to, effect }
    }

    /// Same status requested again; nothing is written.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// One adjustment per product, ordered by product id so stores lock rows in a stable order.
    pub fn stock_adjustments(&self, items: &[OrderItem]) -> Vec<StockAdjustment> {
        let sign = self.effect.sign();
        if sign == 0 {
            return Vec::new();
        }

        let mut per_product: BTreeMap<Uuid, i64> = BTreeMap::new();
        for item in items {
            *per_product.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
        }

        per_product
            .into_iter()
            .map(|(product_id, quantity)| StockAdjustment {
                product_id,
                delta: sign * quantity,
            })
            .collect()
    }
}

/// A stock adjustment as it was applied inside the transition's transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedAdjustment {
    pub product_id: Uuid,
    pub change: StockChange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionOutcome {
    pub order_id: Uuid,
    pub plan: TransitionPlan,
    pub applied: Vec<AppliedAdjustment>,
    /// Products referenced by the order that no longer exist; their stock is not tracked.
    pub skipped_products: Vec<Uuid>,
}

/// Audit record of an applied status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub inventory_effect: InventoryEffect,
    pub actor_id: Uuid,
    pub changed_at: DateTime<Utc>,
}

impl StatusChange {
    pub fn record(order_id: Uuid, plan: &TransitionPlan, actor_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            from_status: plan.from,
            to_status: plan.to,
            inventory_effect: plan.effect,
            actor_id,
            changed_at: Utc::now(),
        }
    }
}
