use async_trait::async_trait;
use glow_order::Order;
use glow_shared::OrderStatusChangedEvent;

use crate::identity::User;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("Notification payload could not be encoded: {0}")]
    Encoding(String),
}

/// Outbound customer notifications (confirmation e-mails, status updates).
///
/// Delivery is best effort. Callers log failures and carry on.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn send_order_confirmation(&self, order: &Order, user: &User) -> Result<(), NotifyError>;

    async fn send_status_changed(&self, _event: &OrderStatusChangedEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn send_order_confirmation(&self, order: &Order, user: &User) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.id,
            user_id = %user.id,
            email = %user.email,
            total_cents = order.total_cents,
            "Order confirmation queued"
        );
        Ok(())
    }

    async fn send_status_changed(&self, event: &OrderStatusChangedEvent) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %event.order_id,
            from = %event.from_status,
            to = %event.to_status,
            "Order status update queued"
        );
        Ok(())
    }
}
