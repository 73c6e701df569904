use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A merchant's store. `available_units` is the shared daily inventory
/// counter; only the ledger in `crate::inventory` mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub owner_id: Uuid,
    pub title: String,
    pub address: String,
    pub available_units: i32,
    pub unit_price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub discounted_price: Option<Decimal>,
    pub is_selling: bool,
    pub pickup_window: Option<String>,
    pub pickup_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
