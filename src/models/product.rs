//! Product listing models
//!
//! Wire shapes returned by the products API. Unknown fields in the payload
//! (images, reviews, dimensions...) are ignored.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Immutable product snapshot as reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    /// 0 to 5
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(rename = "thumbnail", default)]
    pub thumbnail_url: String,
}

impl Product {
    /// Price after applying `discount_percentage`, rounded to cents
    pub fn discounted_price(&self) -> Decimal {
        let hundred = Decimal::ONE_HUNDRED;
        let factor = (hundred - self.discount_percentage.min(hundred)) / hundred;
        (self.price * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// One page of products plus the server-reported total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingResult {
    #[serde(rename = "products")]
    pub items: Vec<Product>,
    #[serde(rename = "total")]
    pub total_count: u64,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
}

/// Product category as listed by `/products/categories`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}
