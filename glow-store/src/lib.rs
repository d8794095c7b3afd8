pub mod app_config;
pub mod database;
pub mod catalog_repo;
pub mod order_repo;
pub mod user_repo;
#[cfg(feature = "kafka")]
pub mod events;

pub use app_config::Config;
pub use catalog_repo::StoreProductRepository;
pub use database::DbClient;
pub use order_repo::StoreOrderRepository;
pub use user_repo::StoreUserRepository;
#[cfg(feature = "kafka")]
pub use events::{EventProducer, KafkaOrderNotifier};

use glow_core::StoreError;

pub(crate) fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(Box::new(e))
}
