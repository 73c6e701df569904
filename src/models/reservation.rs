use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::window::Timestamped;

/// Reservation lifecycle. Statuses only ever move forward; a reservation
/// that should be cancelled is hard-deleted instead (which releases its
/// inventory), so `Cancelled` never reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Forward transitions a store owner may apply. Cancellation is not an
    /// update; it happens through deletion.
    pub fn can_advance_to(self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (ReservationStatus::Pending, ReservationStatus::Confirmed)
                | (ReservationStatus::Pending, ReservationStatus::Completed)
                | (ReservationStatus::Confirmed, ReservationStatus::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Cancelled
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "completed" => Ok(ReservationStatus::Completed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// A customer's claim on `quantity` bags of a store's inventory. Written
/// once at checkout; only `status` changes afterwards. The same shape is
/// used for the durable row and for guest-cart entries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub store_id: String,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_ref: String,
    pub pickup_time: Option<String>,
    pub pickup_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl Timestamped for Reservation {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Reservation joined with the store display fields the listing endpoints
/// return, so clients never need a second lookup.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: Uuid,
    pub store_id: String,
    pub store_name: String,
    pub store_address: String,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_ref: String,
    pub pickup_time: Option<String>,
    pub pickup_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub original_price: Option<Decimal>,
    pub discounted_price: Option<Decimal>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl Timestamped for ReservationView {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Checkout request body, shared by the authenticated, guest, and
/// pay-at-store paths.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub store_id: String,
    pub quantity: i32,
    pub total_amount: Decimal,
    #[serde(default)]
    pub pickup_time: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
