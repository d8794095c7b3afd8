use async_trait::async_trait;
use glow_catalog::Product;
use glow_order::{Order, OrderStatus, StatusChange, TransitionOutcome};
use uuid::Uuid;

use crate::identity::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Stored data is invalid: {0}")]
    Corrupt(String),

    #[error("Transaction aborted: {0}")]
    Aborted(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Read access to the accounts owned by the authentication service.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

/// Repository trait for product catalog access
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, product: &Product) -> Result<Uuid, StoreError>;

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// Products among `ids` that exist. Unknown ids are silently absent.
    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError>;

    /// Admin price edit. Returns `false` if the product does not exist.
    async fn update_pricing(
        &self,
        id: Uuid,
        price_cents: i64,
        sale_price_cents: Option<i64>,
    ) -> Result<bool, StoreError>;
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order and all of its items atomically.
    async fn create_order(&self, order: &Order) -> Result<Uuid, StoreError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError>;

    /// Move the order to `new_status` and apply the planned stock adjustments
    /// in one transaction. The current status is read inside that transaction.
    ///
    /// Returns `None` when the order does not exist. On error nothing is written.
    async fn apply_status_transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor_id: Uuid,
    ) -> Result<Option<TransitionOutcome>, StoreError>;

    async fn list_status_changes(&self, order_id: Uuid) -> Result<Vec<StatusChange>, StoreError>;
}
