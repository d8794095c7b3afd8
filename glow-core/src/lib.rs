pub mod identity;
pub mod repository;
pub mod notification;
pub mod service;
pub mod memory;

pub use identity::{Actor, Role, UnknownRole, User};
pub use memory::InMemoryStore;
pub use notification::{LogNotifier, NotifyError, OrderNotifier};
pub use repository::{OrderRepository, ProductRepository, StoreError, UserRepository};
pub use service::{OrderService, PlacedOrder};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationError(#[from] glow_order::OrderError),

    /// The atomic write could not commit. Nothing was applied.
    #[error("Transaction failed: {0}")]
    TransactionFailure(#[source] StoreError),

    #[error("Internal service error: {0}")]
    InternalError(#[source] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
