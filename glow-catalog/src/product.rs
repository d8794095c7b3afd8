use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::effective_unit_price;

/// A sellable catalog item. Amounts are in cents of the store currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    /// When set, this is the price customers pay.
    pub sale_price_cents: Option<i64>,
    pub stock: i32,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price_cents: i64, stock: i32) -> Result<Self, ProductError> {
        if price_cents < 0 {
            return Err(ProductError::NegativePrice(price_cents));
        }
        if stock < 0 {
            return Err(ProductError::NegativeStock(stock));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price_cents,
            sale_price_cents: None,
            stock,
            image_urls: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_sale_price(mut self, sale_price_cents: i64) -> Self {
        self.sale_price_cents = Some(sale_price_cents);
        self
    }

    /// Price charged for one unit right now.
    pub fn unit_price_cents(&self) -> i64 {
        effective_unit_price(self.price_cents, self.sale_price_cents)
    }

    pub fn is_on_sale(&self) -> bool {
        self.sale_price_cents.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Product price cannot be negative: {0}")]
    NegativePrice(i64),

    #[error("Product stock cannot be negative: {0}")]
    NegativeStock(i32),
}
