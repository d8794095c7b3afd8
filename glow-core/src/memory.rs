//! Process-local store used by tests and local demos.
//!
//! A single mutex guards all tables, so every operation is serialized the
//! same way a row lock serializes transitions on one order in PostgreSQL.
//! Transitions stage their stock changes first, then write them while keeping
//! an undo log, so a failure at any point leaves every row as it was.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glow_catalog::{apply_stock_delta, Product};
use glow_order::{AppliedAdjustment, Order, OrderStatus, StatusChange, TransitionOutcome, TransitionPlan};
use uuid::Uuid;

use crate::identity::User;
use crate::repository::{OrderRepository, ProductRepository, StoreError, UserRepository};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    status_changes: Vec<StatusChange>,
    failing_stock_updates: HashSet<Uuid>,
    abort_after_stock_writes: Option<usize>,
    fail_order_inserts: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.lock()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn remove_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.lock()?.products.remove(&id))
    }

    pub fn stock_of(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        Ok(self.lock()?.products.get(&id).map(|p| p.stock))
    }

    /// Overwrite stock directly, bypassing transitions. Used to simulate drifted data.
    pub fn set_stock(&self, id: Uuid, stock: i32) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        match tables.products.get_mut(&id) {
            Some(product) => {
                product.stock = stock;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Make every transition that adjusts this product's stock abort.
    pub fn fail_stock_updates_for(&self, product_id: Uuid) -> Result<(), StoreError> {
        self.lock()?.failing_stock_updates.insert(product_id);
        Ok(())
    }

    /// Abort the next transitions once `writes` stock rows have been written,
    /// before the status is updated.
    pub fn fail_after_stock_writes(&self, writes: usize) -> Result<(), StoreError> {
        self.lock()?.abort_after_stock_writes = Some(writes);
        Ok(())
    }

    pub fn clear_failures(&self) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.failing_stock_updates.clear();
        tables.abort_after_stock_writes = None;
        tables.fail_order_inserts = false;
        Ok(())
    }

    pub fn fail_order_inserts(&self) -> Result<(), StoreError> {
        self.lock()?.fail_order_inserts = true;
        Ok(())
    }
}

fn roll_back(products: &mut HashMap<Uuid, Product>, undo: Vec<(Uuid, i32, DateTime<Utc>)>) {
    for (id, stock, updated_at) in undo.into_iter().rev() {
        if let Some(product) = products.get_mut(&id) {
            product.stock = stock;
            product.updated_at = updated_at;
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create_product(&self, product: &Product) -> Result<Uuid, StoreError> {
        self.lock()?.products.insert(product.id, product.clone());
        Ok(product.id)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
    }

    async fn update_pricing(
        &self,
        id: Uuid,
        price_cents: i64,
        sale_price_cents: Option<i64>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        match tables.products.get_mut(&id) {
            Some(product) => {
                product.price_cents = price_cents;
                product.sale_price_cents = sale_price_cents;
                product.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: &Order) -> Result<Uuid, StoreError> {
        let mut tables = self.lock()?;
        if tables.fail_order_inserts {
            return Err(StoreError::Aborted("order insert rejected".to_string()));
        }
        tables.orders.insert(order.id, order.clone());
        Ok(order.id)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let tables = self.lock()?;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError> {
        let tables = self.lock()?;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| status.map_or(true, |s| order.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn apply_status_transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor_id: Uuid,
    ) -> Result<Option<TransitionOutcome>, StoreError> {
        let mut guard = self.lock()?;
        let tables = &mut *guard;

        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(None);
        };

        let plan = TransitionPlan::new(order.status, new_status);
        let mut outcome = TransitionOutcome {
            order_id,
            plan,
            applied: Vec::new(),
            skipped_products: Vec::new(),
        };
        if plan.is_noop() {
            return Ok(Some(outcome));
        }

        // Stage every stock change before writing anything.
        for adjustment in plan.stock_adjustments(&order.items) {
            if tables.failing_stock_updates.contains(&adjustment.product_id) {
                return Err(StoreError::Aborted(format!(
                    "stock update failed for product {}",
                    adjustment.product_id
                )));
            }
            match tables.products.get(&adjustment.product_id) {
                Some(product) => outcome.applied.push(AppliedAdjustment {
                    product_id: adjustment.product_id,
                    change: apply_stock_delta(product.stock, adjustment.delta),
                }),
                None => outcome.skipped_products.push(adjustment.product_id),
            }
        }

        let now = Utc::now();
        let mut undo: Vec<(Uuid, i32, DateTime<Utc>)> = Vec::with_capacity(outcome.applied.len());
        for applied in &outcome.applied {
            if let Some(product) = tables.products.get_mut(&applied.product_id) {
                undo.push((product.id, product.stock, product.updated_at));
                product.stock = applied.change.current;
                product.updated_at = now;
            }

            if tables.abort_after_stock_writes.is_some_and(|limit| undo.len() >= limit) {
                roll_back(&mut tables.products, undo);
                return Err(StoreError::Aborted(format!(
                    "transition of order {} aborted after stock writes",
                    order_id
                )));
            }
        }
        order.update_status(new_status);
        tables
            .status_changes
            .push(StatusChange::record(order_id, &plan, actor_id));

        Ok(Some(outcome))
    }

    async fn list_status_changes(&self, order_id: Uuid) -> Result<Vec<StatusChange>, StoreError> {
        Ok(self
            .lock()?
            .status_changes
            .iter()
            .filter(|change| change.order_id == order_id)
            .cloned()
            .collect())
    }
}
