use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;
use crate::{StoreOrderRepository, StoreProductRepository, StoreUserRepository};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn users(&self) -> Arc<StoreUserRepository> {
        Arc::new(StoreUserRepository::new(self.pool.clone()))
    }

    pub fn products(&self) -> Arc<StoreProductRepository> {
        Arc::new(StoreProductRepository::new(self.pool.clone()))
    }

    pub fn orders(&self) -> Arc<StoreOrderRepository> {
        Arc::new(StoreOrderRepository::new(self.pool.clone()))
    }
}
