//! Server-side price selection.
//!
//! Checkout never trusts a client-supplied price: the unit price of a line is
//! always derived from the catalog row at the moment the order is placed.

/// The sale price overrides the list price whenever one is set.
pub fn effective_unit_price(price_cents: i64, sale_price_cents: Option<i64>) -> i64 {
    sale_price_cents.unwrap_or(price_cents)
}

/// `None` when the product does not fit in an `i64`.
pub fn line_total(unit_price_cents: i64, quantity: u32) -> Option<i64> {
    unit_price_cents.checked_mul(i64::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_unit_price() {
        assert_eq!(effective_unit_price(10_000, None), 10_000);
        assert_eq!(effective_unit_price(10_000, Some(7_500)), 7_500);
        // A zero sale price is still a sale price.
        assert_eq!(effective_unit_price(10_000, Some(0)), 0);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(10_000, 2), Some(20_000));
        assert_eq!(line_total(5_000, 0), Some(0));
        assert_eq!(line_total(i64::MAX / 2 + 1, 2), None);
    }
}
