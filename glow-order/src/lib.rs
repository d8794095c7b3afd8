pub mod models;
pub mod shipping;
pub mod checkout;
pub mod transition;

pub use models::{Order, OrderError, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingDetails};
pub use shipping::{calculate_shipping_fee, ShippingQuote, ShippingTable, ShippingZone, ZoneRate};
pub use checkout::{distinct_product_ids, quote_checkout, CartLine, CheckoutQuote, PricedLine, MAX_LINE_QUANTITY};
pub use transition::{
    AppliedAdjustment, InventoryEffect, StatusChange, StockAdjustment, TransitionOutcome, TransitionPlan,
};
