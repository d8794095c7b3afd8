pub mod pii;
pub mod models {
    pub mod events;
}

pub use models::events::{OrderPlacedEvent, OrderStatusChangedEvent};
pub use pii::Masked;
