//! PostgreSQL order storage.
//!
//! A status transition runs in one transaction: the order row is locked with
//! `FOR UPDATE` before its status is read, then every affected product row is
//! locked in ascending id order. Two transitions on the same order therefore
//! serialize, and transitions on different orders sharing products cannot
//! deadlock each other.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glow_catalog::apply_stock_delta;
use glow_core::{OrderRepository, StoreError};
use glow_order::{
    AppliedAdjustment, InventoryEffect, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    ShippingDetails, StatusChange, TransitionOutcome, TransitionPlan,
};
use glow_shared::Masked;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db_error;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    subtotal_cents: i64,
    shipping_fee_cents: Option<i64>,
    total_cents: i64,
    payment_method: String,
    payment_status: String,
    ship_full_name: String,
    ship_phone: String,
    ship_address_line: String,
    ship_city: String,
    ship_postal_code: Option<String>,
    ship_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price_cents: i64,
}

#[derive(sqlx::FromRow)]
struct StatusChangeRow {
    id: Uuid,
    order_id: Uuid,
    from_status: String,
    to_status: String,
    inventory_effect: String,
    actor_id: Uuid,
    changed_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = "id, user_id, status, subtotal_cents, shipping_fee_cents, total_cents, \
     payment_method, payment_status, ship_full_name, ship_phone, ship_address_line, ship_city, \
     ship_postal_code, ship_notes, created_at, updated_at";

fn parse_status(value: &str) -> Result<OrderStatus, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown order status {}", value)))
}

fn parse_effect(value: &str) -> Result<InventoryEffect, StoreError> {
    match value {
        "NONE" => Ok(InventoryEffect::None),
        "DECREMENT" => Ok(InventoryEffect::Decrement),
        "RESTOCK" => Ok(InventoryEffect::Restock),
        other => Err(StoreError::Corrupt(format!("unknown inventory effect {}", other))),
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| StoreError::Corrupt(format!("order item {} has quantity {}", row.id, row.quantity)))?;

        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity,
            unit_price_cents: row.unit_price_cents,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let payment_method: PaymentMethod = self
            .payment_method
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown payment method {}", self.payment_method)))?;
        let payment_status: PaymentStatus = self
            .payment_status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown payment status {}", self.payment_status)))?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            status: parse_status(&self.status)?,
            items,
            subtotal_cents: self.subtotal_cents,
            shipping_fee_cents: self.shipping_fee_cents,
            total_cents: self.total_cents,
            payment_method,
            payment_status,
            shipping: ShippingDetails {
                full_name: self.ship_full_name,
                phone: Masked(self.ship_phone),
                address_line: self.ship_address_line,
                city: self.ship_city,
                postal_code: self.ship_postal_code,
                notes: self.ship_notes,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<StatusChangeRow> for StatusChange {
    type Error = StoreError;

    fn try_from(row: StatusChangeRow) -> Result<Self, Self::Error> {
        Ok(StatusChange {
            id: row.id,
            order_id: row.order_id,
            from_status: parse_status(&row.from_status)?,
            to_status: parse_status(&row.to_status)?,
            inventory_effect: parse_effect(&row.inventory_effect)?,
            actor_id: row.actor_id,
            changed_at: row.changed_at,
        })
    }
}

async fn fetch_items(conn: &mut PgConnection, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, StoreError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT id, order_id, product_id, product_name, quantity, unit_price_cents
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        "#,
    )
    .bind(order_ids)
    .fetch_all(conn)
    .await
    .map_err(db_error)?;

    rows.into_iter().map(OrderItem::try_from).collect()
}

/// Attach items to their orders, keeping the row order of `rows`.
fn assemble(rows: Vec<OrderRow>, items: Vec<OrderItem>) -> Result<Vec<Order>, StoreError> {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect()
}

impl StoreOrderRepository {
    async fn load_orders(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let items = fetch_items(&mut conn, &ids).await?;
        assemble(rows, items)
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &Order) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, subtotal_cents, shipping_fee_cents, total_cents,
                                payment_method, payment_status, ship_full_name, ship_phone,
                                ship_address_line, ship_city, ship_postal_code, ship_notes,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.subtotal_cents)
        .bind(order.shipping_fee_cents)
        .bind(order.total_cents)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.shipping.full_name)
        .bind(order.shipping.phone.inner())
        .bind(&order.shipping.address_line)
        .bind(&order.shipping.city)
        .bind(&order.shipping.postal_code)
        .bind(&order.shipping.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for (position, item) in order.items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| StoreError::Aborted(format!("quantity {} out of range", item.quantity)))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price_cents, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(quantity)
            .bind(item.unit_price_cents)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        Ok(order.id)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.load_orders(vec![row]).await?.pop())
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        self.load_orders(rows).await
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        self.load_orders(rows).await
    }

    async fn apply_status_transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor_id: Uuid,
    ) -> Result<Option<TransitionOutcome>, StoreError> {
        // Dropping `tx` on any early return rolls the transaction back.
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let Some(current) = current else {
            return Ok(None);
        };

        let plan = TransitionPlan::new(parse_status(&current)?, new_status);
        let mut outcome = TransitionOutcome {
            order_id,
            plan,
            applied: Vec::new(),
            skipped_products: Vec::new(),
        };
        if plan.is_noop() {
            return Ok(Some(outcome));
        }

        let items = fetch_items(&mut tx, &[order_id]).await?;

        // Adjustments come sorted by product id, which fixes the lock order.
        for adjustment in plan.stock_adjustments(&items) {
            let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(adjustment.product_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;

            let Some(stock) = stock else {
                outcome.skipped_products.push(adjustment.product_id);
                continue;
            };

            let change = apply_stock_delta(stock, adjustment.delta);
            sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
                .bind(adjustment.product_id)
                .bind(change.current)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;

            outcome.applied.push(AppliedAdjustment {
                product_id: adjustment.product_id,
                change,
            });
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let change = StatusChange::record(order_id, &plan, actor_id);
        sqlx::query(
            r#"
            INSERT INTO order_status_changes (id, order_id, from_status, to_status, inventory_effect, actor_id, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(change.id)
        .bind(change.order_id)
        .bind(change.from_status.as_str())
        .bind(change.to_status.as_str())
        .bind(change.inventory_effect.as_str())
        .bind(change.actor_id)
        .bind(change.changed_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(Some(outcome))
    }

    async fn list_status_changes(&self, order_id: Uuid) -> Result<Vec<StatusChange>, StoreError> {
        let rows = sqlx::query_as::<_, StatusChangeRow>(
            r#"
            SELECT id, order_id, from_status, to_status, inventory_effect, actor_id, changed_at
            FROM order_status_changes
            WHERE order_id = $1
            ORDER BY changed_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(StatusChange::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_row(id: Uuid, status: &str) -> OrderRow {
        let now = Utc::now();
        OrderRow {
            id,
            user_id: Uuid::new_v4(),
            status: status.to_string(),
            subtotal_cents: 25_000,
            shipping_fee_cents: Some(2_500),
            total_cents: 27_500,
            payment_method: "CASH_ON_DELIVERY".to_string(),
            payment_status: "PENDING".to_string(),
            ship_full_name: "Salma Idrissi".to_string(),
            ship_phone: "0612345678".to_string(),
            ship_address_line: "12 Avenue Mohammed V".to_string(),
            ship_city: "Rabat".to_string(),
            ship_postal_code: None,
            ship_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(order_id: Uuid, quantity: u32) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: "Argan Oil".to_string(),
            quantity,
            unit_price_cents: 10_000,
        }
    }

    #[test]
    fn test_assemble_groups_items_by_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let items = vec![item(first, 2), item(second, 1), item(first, 1)];

        let orders = assemble(vec![order_row(second, "PENDING"), order_row(first, "SHIPPED")], items).unwrap();

        assert_eq!(orders[0].id, second);
        assert_eq!(orders[0].items.len(), 1);
        assert_eq!(orders[1].id, first);
        assert_eq!(orders[1].status, OrderStatus::Shipped);
        assert_eq!(orders[1].item_count(), 3);
        assert_eq!(orders[1].shipping.phone.inner(), "0612345678");
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let result = assemble(vec![order_row(Uuid::new_v4(), "LOST")], Vec::new());
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_negative_quantity_is_corrupt() {
        let row = OrderItemRow {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Rose Water".to_string(),
            quantity: -1,
            unit_price_cents: 4_000,
        };
        assert!(matches!(OrderItem::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_status_change_row_conversion() {
        let row = StatusChangeRow {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            from_status: "PROCESSING".to_string(),
            to_status: "CANCELLED".to_string(),
            inventory_effect: "RESTOCK".to_string(),
            actor_id: Uuid::new_v4(),
            changed_at: Utc::now(),
        };
        let change = StatusChange::try_from(row).unwrap();
        assert_eq!(change.from_status, OrderStatus::Processing);
        assert_eq!(change.inventory_effect, InventoryEffect::Restock);

        assert!(parse_effect("SHRINK").is_err());
    }
}
