//! Delivery fee zones.
//!
//! Cities are matched after normalization (case, accents, hyphens and extra
//! whitespace are ignored). Anything not recognized as zone one is billed as
//! zone two, so a typo can only make delivery more expensive, never free.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingZone {
    /// Capital region.
    ZoneOne,
    ZoneTwo,
}

/// Fee for a zone and the subtotal from which delivery is free.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneRate {
    pub fee_cents: i64,
    pub free_from_cents: i64,
}

impl ZoneRate {
    pub fn fee_for(&self, subtotal_cents: i64) -> i64 {
        if subtotal_cents >= self.free_from_cents {
            0
        } else {
            self.fee_cents
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShippingTable {
    pub zone_one_cities: Vec<String>,
    pub zone_one: ZoneRate,
    pub zone_two: ZoneRate,
}

impl Default for ShippingTable {
    fn default() -> Self {
        Self {
            zone_one_cities: ["Rabat", "Salé", "Témara", "Skhirat", "Harhoura"]
                .into_iter()
                .map(String::from)
                .collect(),
            zone_one: ZoneRate {
                fee_cents: 2_500,
                free_from_cents: 40_000,
            },
            zone_two: ZoneRate {
                fee_cents: 4_500,
                free_from_cents: 60_000,
            },
        }
    }
}

/// What the checkout preview shows next to the cart total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingQuote {
    pub zone: ShippingZone,
    pub fee_cents: i64,
    pub free_from_cents: i64,
    /// How much more the customer has to add to get free delivery.
    pub remaining_for_free_cents: i64,
}

impl ShippingTable {
    pub fn zone_for(&self, city: &str) -> ShippingZone {
        let wanted = normalize_city(city);
        if wanted.is_empty() {
            return ShippingZone::ZoneTwo;
        }

        let known = self
            .zone_one_cities
            .iter()
            .any(|candidate| normalize_city(candidate) == wanted);

        if known {
            ShippingZone::ZoneOne
        } else {
            ShippingZone::ZoneTwo
        }
    }

    pub fn rate(&self, zone: ShippingZone) -> ZoneRate {
        match zone {
            ShippingZone::ZoneOne => self.zone_one,
            ShippingZone::ZoneTwo => self.zone_two,
        }
    }

    pub fn fee_for(&self, city: &str, subtotal_cents: i64) -> i64 {
        self.rate(self.zone_for(city)).fee_for(subtotal_cents)
    }

    pub fn quote(&self, city: &str, subtotal_cents: i64) -> ShippingQuote {
        let zone = self.zone_for(city);
        let rate = self.rate(zone);

        ShippingQuote {
            zone,
            fee_cents: rate.fee_for(subtotal_cents),
            free_from_cents: rate.free_from_cents,
            remaining_for_free_cents: (rate.free_from_cents - subtotal_cents).max(0),
        }
    }
}

fn default_table() -> &'static ShippingTable {
    static TABLE: OnceLock<ShippingTable> = OnceLock::new();
    TABLE.get_or_init(ShippingTable::default)
}

/// Delivery fee with the built-in zone table.
pub fn calculate_shipping_fee(city: &str, subtotal_cents: i64) -> i64 {
    default_table().fee_for(city, subtotal_cents)
}

fn normalize_city(city: &str) -> String {
    let folded: String = city
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ä' | 'À' | 'Á' | 'Â' | 'Ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
            'î' | 'ï' | 'Î' | 'Ï' => 'i',
            'ô' | 'ö' | 'Ô' | 'Ö' => 'o',
            'ù' | 'û' | 'ü' | 'Ù' | 'Û' | 'Ü' => 'u',
            'ç' | 'Ç' => 'c',
            '-' | '_' | '\'' => ' ',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
