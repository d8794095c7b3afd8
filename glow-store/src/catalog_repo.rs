use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glow_catalog::Product;
use glow_core::{ProductRepository, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db_error;

pub struct StoreProductRepository {
    pool: PgPool,
}

impl StoreProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price_cents: i64,
    sale_price_cents: Option<i64>,
    stock: i32,
    image_urls: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price_cents: row.price_cents,
            sale_price_cents: row.sale_price_cents,
            stock: row.stock,
            image_urls: row.image_urls,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, sale_price_cents, stock, image_urls, created_at, updated_at";

#[async_trait]
impl ProductRepository for StoreProductRepository {
    async fn create_product(&self, product: &Product) -> Result<Uuid, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, sale_price_cents, stock, image_urls, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(&product.image_urls)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(product.id)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Product::from))
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = ANY($1) ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn update_pricing(
        &self,
        id: Uuid,
        price_cents: i64,
        sale_price_cents: Option<i64>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET price_cents = $2, sale_price_cents = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(price_cents)
        .bind(sale_price_cents)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
