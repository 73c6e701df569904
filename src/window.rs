//! Rolling time-window classification of reservations.
//!
//! Reservation lists are split into "current" and "past" buckets at read
//! time, based on when the reservation was created. Nothing is stored: a
//! reservation migrates from current to past simply by aging out.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a reservation counts as "current" after creation.
pub fn window() -> Duration {
    Duration::hours(24)
}

/// Anything with an authoritative creation instant can be classified.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

pub fn is_current(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created_at > now - window()
}

/// Both arrays and both counts are always present, never null, so clients
/// can render empty states without special-casing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buckets<T> {
    pub current_reservations: Vec<T>,
    pub past_reservations: Vec<T>,
    pub current_count: usize,
    pub past_count: usize,
}

impl<T> Buckets<T> {
    pub fn empty() -> Self {
        Self {
            current_reservations: Vec::new(),
            past_reservations: Vec::new(),
            current_count: 0,
            past_count: 0,
        }
    }
}

pub fn classify<T: Timestamped>(items: Vec<T>, now: DateTime<Utc>) -> Buckets<T> {
    let mut current = Vec::new();
    let mut past = Vec::new();

    for item in items {
        if is_current(item.created_at(), now) {
            current.push(item);
        } else {
            past.push(item);
        }
    }

    Buckets {
        current_count: current.len(),
        past_count: past.len(),
        current_reservations: current,
        past_reservations: past,
    }
}
