pub mod product;
pub mod pricing;
pub mod inventory;

pub use product::{Product, ProductError};
pub use pricing::{effective_unit_price, line_total};
pub use inventory::{apply_stock_delta, StockChange};
