use serde::{Deserialize, Serialize};

/// Result of applying a signed quantity delta to a product's stock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockChange {
    pub previous: i32,
    pub delta: i64,
    pub current: i32,
    /// The raw result was below zero and has been floored.
    pub clamped: bool,
}

/// Apply `delta` to `current`, flooring at zero.
///
/// Decrements mirror earlier increments one-to-one, so a negative raw result
/// means the stored stock was already wrong. The caller logs it; the
/// transition itself still goes through.
pub fn apply_stock_delta(current: i32, delta: i64) -> StockChange {
    let raw = i64::from(current) + delta;
    let floored = raw.clamp(0, i64::from(i32::MAX));

    StockChange {
        previous: current,
        delta,
        current: floored as i32,
        clamped: raw < 0,
    }
}
