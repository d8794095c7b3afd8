use std::sync::Arc;

use glow_order::{
    distinct_product_ids, quote_checkout, CartLine, Order, OrderStatus, ShippingDetails, ShippingQuote,
    ShippingTable, StatusChange, TransitionOutcome,
};
use glow_shared::OrderStatusChangedEvent;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::identity::{Actor, User};
use crate::notification::OrderNotifier;
use crate::repository::{OrderRepository, ProductRepository, UserRepository};
use crate::{CoreError, CoreResult};

/// Result of a checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    /// Requested products that were dropped because they no longer exist.
    pub unavailable: Vec<Uuid>,
}

impl PlacedOrder {
    pub fn order_id(&self) -> Uuid {
        self.order.id
    }

    pub fn total_cents(&self) -> i64 {
        self.order.total_cents
    }
}

/// Checkout and order-status operations over the store.
#[derive(Clone)]
pub struct OrderService {
    users: Arc<dyn UserRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn OrderNotifier>,
    shipping: ShippingTable,
}

impl OrderService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        Self {
            users,
            products,
            orders,
            notifier,
            shipping: ShippingTable::default(),
        }
    }

    pub fn with_shipping_table(mut self, shipping: ShippingTable) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn shipping_table(&self) -> &ShippingTable {
        &self.shipping
    }

    /// Live delivery fee preview for the checkout page.
    pub fn quote_shipping(&self, city: &str, subtotal_cents: i64) -> ShippingQuote {
        self.shipping.quote(city, subtotal_cents)
    }

    /// Price the cart from catalog rows and persist a pending cash-on-delivery order.
    ///
    /// Stock is not touched here; it moves when an administrator commits the order.
    #[instrument(skip(self, items, shipping), fields(lines = items.len()))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        items: &[CartLine],
        shipping: ShippingDetails,
    ) -> CoreResult<PlacedOrder> {
        let user = self
            .users
            .get_user(user_id)
            .await
            .map_err(CoreError::InternalError)?
            .ok_or(CoreError::Unauthenticated)?;

        shipping.validate()?;

        let product_ids = distinct_product_ids(items);
        let products = self
            .products
            .get_products(&product_ids)
            .await
            .map_err(CoreError::InternalError)?;

        let quote = quote_checkout(items, &products, &shipping.city, &self.shipping)?;
        if !quote.unavailable.is_empty() {
            info!(dropped = ?quote.unavailable, "Dropping cart lines for products no longer available");
        }

        let order = Order::place(user.id, &quote, shipping);
        self.orders
            .create_order(&order)
            .await
            .map_err(CoreError::TransactionFailure)?;

        info!(
            order_id = %order.id,
            subtotal_cents = order.subtotal_cents,
            shipping_fee_cents = ?order.shipping_fee_cents,
            total_cents = order.total_cents,
            "Order placed"
        );

        self.dispatch_confirmation(&order, user);

        Ok(PlacedOrder {
            order,
            unavailable: quote.unavailable,
        })
    }

    /// Move an order to `new_status`, adjusting stock when it enters or leaves fulfillment.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn set_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &Actor,
    ) -> CoreResult<TransitionOutcome> {
        if let Err(e) = actor.require_admin() {
            warn!(%order_id, "Non-admin attempted an order status change");
            return Err(e);
        }

        let outcome = self
            .orders
            .apply_status_transition(order_id, new_status, actor.user_id)
            .await
            .map_err(|e| {
                error!(%order_id, error = %e, "Order status transition failed");
                CoreError::TransactionFailure(e)
            })?
            .ok_or_else(|| CoreError::NotFound(format!("Order {}", order_id)))?;

        for applied in outcome.applied.iter().filter(|applied| applied.change.clamped) {
            warn!(
                %order_id,
                product_id = %applied.product_id,
                stock = applied.change.previous,
                delta = applied.change.delta,
                "Stock would have gone negative; floored at zero"
            );
        }
        for product_id in &outcome.skipped_products {
            warn!(%order_id, %product_id, "Product no longer exists; stock not adjusted");
        }

        if outcome.plan.is_noop() {
            info!(%order_id, status = %new_status, "Order already in requested status");
            return Ok(outcome);
        }

        info!(
            %order_id,
            from = %outcome.plan.from,
            to = %outcome.plan.to,
            effect = outcome.plan.effect.as_str(),
            "Order status changed"
        );

        self.dispatch_status_changed(OrderStatusChangedEvent {
            order_id,
            from_status: outcome.plan.from.to_string(),
            to_status: outcome.plan.to.to_string(),
            inventory_effect: outcome.plan.effect.as_str().to_string(),
            actor_id: actor.user_id,
            timestamp: chrono::Utc::now().timestamp(),
        });

        Ok(outcome)
    }

    /// Owners see their own orders, admins see all. Anyone else gets `NotFound`.
    pub async fn get_order(&self, order_id: Uuid, actor: &Actor) -> CoreResult<Order> {
        let order = self
            .orders
            .get_order(order_id)
            .await
            .map_err(CoreError::InternalError)?
            .filter(|order| actor.is_admin() || order.user_id == actor.user_id)
            .ok_or_else(|| CoreError::NotFound(format!("Order {}", order_id)))?;

        Ok(order)
    }

    pub async fn list_my_orders(&self, actor: &Actor) -> CoreResult<Vec<Order>> {
        self.orders
            .list_orders_for_user(actor.user_id)
            .await
            .map_err(CoreError::InternalError)
    }

    pub async fn list_orders(&self, status: Option<OrderStatus>, actor: &Actor) -> CoreResult<Vec<Order>> {
        actor.require_admin()?;
        self.orders.list_orders(status).await.map_err(CoreError::InternalError)
    }

    pub async fn order_history(&self, order_id: Uuid, actor: &Actor) -> CoreResult<Vec<StatusChange>> {
        actor.require_admin()?;
        if self
            .orders
            .get_order(order_id)
            .await
            .map_err(CoreError::InternalError)?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("Order {}", order_id)));
        }

        self.orders
            .list_status_changes(order_id)
            .await
            .map_err(CoreError::InternalError)
    }

    fn dispatch_confirmation(&self, order: &Order, user: User) {
        let notifier = Arc::clone(&self.notifier);
        let order = order.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_order_confirmation(&order, &user).await {
                error!(order_id = %order.id, error = %e, "Failed to send order confirmation");
            }
        });
    }

    fn dispatch_status_changed(&self, event: OrderStatusChangedEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_status_changed(&event).await {
                error!(order_id = %event.order_id, error = %e, "Failed to send status update");
            }
        });
    }
}
