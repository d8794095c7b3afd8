use glow_catalog::{line_total, Product};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::models::OrderError;
use crate::shipping::ShippingTable;

/// A cart line as submitted by the client. Prices are never accepted from the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// Server-side pricing of a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutQuote {
    pub lines: Vec<PricedLine>,
    /// Requested products that no longer exist in the catalog.
    pub unavailable: Vec<Uuid>,
    pub subtotal_cents: i64,
    pub shipping_fee_cents: i64,
    pub total_cents: i64,
}

/// Largest quantity a single cart line may carry (the `order_items.quantity` column is an `INTEGER`).
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// Distinct product ids referenced by a cart, in ascending order.
pub fn distinct_product_ids(lines: &[CartLine]) -> Vec<Uuid> {
    lines
        .iter()
        .map(|line| line.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Price `lines` against the catalog rows in `products`.
///
/// Lines whose product is missing from `products` are dropped and reported in
/// `unavailable`. Line order is preserved.
pub fn quote_checkout(
    lines: &[CartLine],
    products: &[Product],
    city: &str,
    shipping: &ShippingTable,
) -> Result<CheckoutQuote, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
        return Err(OrderError::InvalidQuantity(line.product_id));
    }
    if let Some(line) = lines.iter().find(|line| line.quantity > MAX_LINE_QUANTITY) {
        return Err(OrderError::QuantityOutOfRange {
            product_id: line.product_id,
            quantity: i64::from(line.quantity),
        });
    }

    let catalog: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut priced = Vec::with_capacity(lines.len());
    let mut unavailable = Vec::new();

    for line in lines {
        match catalog.get(&line.product_id) {
            Some(product) => {
                let unit_price_cents = product.unit_price_cents();
                let line_total_cents =
                    line_total(unit_price_cents, line.quantity).ok_or(OrderError::AmountOverflow)?;
                priced.push(PricedLine {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    quantity: line.quantity,
                    unit_price_cents,
                    line_total_cents,
                });
            }
            None => {
                if !unavailable.contains(&line.product_id) {
                    unavailable.push(line.product_id);
                }
            }
        }
    }

    if priced.is_empty() {
        return Err(OrderError::NoAvailableItems);
    }

    let subtotal_cents = priced
        .iter()
        .try_fold(0i64, |total, line| total.checked_add(line.line_total_cents))
        .ok_or(OrderError::AmountOverflow)?;
    let shipping_fee_cents = shipping.fee_for(city, subtotal_cents);
    let total_cents = subtotal_cents
        .checked_add(shipping_fee_cents)
        .ok_or(OrderError::AmountOverflow)?;

    Ok(CheckoutQuote {
        lines: priced,
        unavailable,
        subtotal_cents,
        shipping_fee_cents,
        total_cents,
    })
}
