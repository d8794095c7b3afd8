use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use glow_order::ShippingQuote;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    #[serde(default)]
    pub city: String,
    pub subtotal_cents: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/shipping/quote", get(quote))
}

/// GET /v1/shipping/quote?city=Rabat&subtotal_cents=25000
/// Live delivery fee preview for the checkout page
pub async fn quote(State(state): State<AppState>, Query(query): Query<QuoteQuery>) -> Json<ShippingQuote> {
    Json(state.service.quote_shipping(&query.city, query.subtotal_cents))
}
