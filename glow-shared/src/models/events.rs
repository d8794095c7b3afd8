use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderPlacedEvent {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub customer_email: crate::pii::Masked<String>,
    pub total_cents: i64,
    pub shipping_fee_cents: Option<i64>,
    pub item_count: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub inventory_effect: String,
    pub actor_id: Uuid,
    pub timestamp: i64,
}
