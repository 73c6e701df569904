//! Session-scoped cart of guest reservations.
//!
//! Guests have no account, so their "my orders" view is served from a
//! per-session container keyed by an opaque cookie token. The cart is not
//! authoritative; the durable reservations table is. It only saves a
//! database round trip, and it must tolerate missing or empty sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::models::Reservation;
use crate::window;

pub const SESSION_COOKIE: &str = "guest_session";

/// Read the guest session token from the cookie jar, minting a new one (and
/// setting the cookie) on first contact.
pub fn session_token(cookies: &Cookies) -> Uuid {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Ok(token) = Uuid::parse_str(cookie.value()) {
            return token;
        }
    }

    let token = Uuid::new_v4();
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);
    token
}

#[derive(Clone, Default)]
pub struct GuestCart {
    inner: Arc<Mutex<HashMap<Uuid, Vec<Reservation>>>>,
}

impl GuestCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, session: Uuid, reservation: Reservation) {
        let mut sessions = self.inner.lock().expect("cart lock poisoned");
        sessions.entry(session).or_default().push(reservation);
    }

    /// List the session's reservations, pruning entries that have aged out
    /// of the display window and persisting the pruned list back.
    pub fn list(&self, session: Uuid, now: DateTime<Utc>) -> Vec<Reservation> {
        let mut sessions = self.inner.lock().expect("cart lock poisoned");
        let Some(reservations) = sessions.get_mut(&session) else {
            return Vec::new();
        };

        reservations.retain(|r| window::is_current(r.created_at, now));
        if reservations.is_empty() {
            sessions.remove(&session);
            return Vec::new();
        }
        reservations.clone()
    }

    pub fn contains(&self, session: Uuid, reservation_id: Uuid) -> bool {
        let sessions = self.inner.lock().expect("cart lock poisoned");
        sessions
            .get(&session)
            .map(|rs| rs.iter().any(|r| r.id == reservation_id))
            .unwrap_or(false)
    }

    /// Returns true if the reservation was present and removed.
    pub fn remove(&self, session: Uuid, reservation_id: Uuid) -> bool {
        let mut sessions = self.inner.lock().expect("cart lock poisoned");
        let Some(reservations) = sessions.get_mut(&session) else {
            return false;
        };

        let before = reservations.len();
        reservations.retain(|r| r.id != reservation_id);
        let removed = reservations.len() < before;
        if reservations.is_empty() {
            sessions.remove(&session);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn reservation(created_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            customer_id: None,
            store_id: "store-1".to_string(),
            quantity: 1,
            total_amount: Decimal::new(999, 2),
            status: "confirmed".to_string(),
            payment_ref: format!("guest-pay-{}", Uuid::new_v4()),
            pickup_time: None,
            pickup_timestamp: None,
            created_at,
            customer_name: "Guest".to_string(),
            customer_email: "guest@example.com".to_string(),
            customer_phone: String::new(),
        }
    }

    #[test]
    fn append_then_list() {
        let cart = GuestCart::new();
        let session = Uuid::new_v4();
        let now = Utc::now();

        cart.append(session, reservation(now));
        cart.append(session, reservation(now));

        assert_eq!(cart.list(session, now).len(), 2);
    }

    #[test]
    fn missing_session_lists_empty() {
        let cart = GuestCart::new();
        assert!(cart.list(Uuid::new_v4(), Utc::now()).is_empty());
    }

    #[test]
    fn list_prunes_aged_out_entries() {
        let cart = GuestCart::new();
        let session = Uuid::new_v4();
        let now = Utc::now();

        cart.append(session, reservation(now - Duration::hours(30)));
        let fresh = reservation(now - Duration::hours(1));
        let fresh_id = fresh.id;
        cart.append(session, fresh);

        let listed = cart.list(session, now);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, fresh_id);

        // The pruned list was persisted back.
        assert_eq!(cart.list(session, now).len(), 1);
    }

    // The cart is the guest's proof of ownership for cancellation, so the
    // cancellation horizon equals the display window: aged-out entries are
    // gone, entries still inside the window survive pruning and stay
    // removable.
    #[test]
    fn pruning_bounds_the_cancellation_horizon() {
        let cart = GuestCart::new();
        let session = Uuid::new_v4();
        let now = Utc::now();

        let aged = reservation(now - Duration::hours(30));
        let aged_id = aged.id;
        cart.append(session, aged);

        let fresh = reservation(now - Duration::hours(1));
        let fresh_id = fresh.id;
        cart.append(session, fresh);

        cart.list(session, now);

        assert!(!cart.contains(session, aged_id));
        assert!(cart.contains(session, fresh_id));
        assert!(cart.remove(session, fresh_id));
    }

    #[test]
    fn remove_reports_presence() {
        let cart = GuestCart::new();
        let session = Uuid::new_v4();
        let now = Utc::now();

        let kept = reservation(now);
        let kept_id = kept.id;
        cart.append(session, kept);

        assert!(cart.contains(session, kept_id));
        assert!(cart.remove(session, kept_id));
        assert!(!cart.remove(session, kept_id));
        assert!(!cart.contains(session, kept_id));
        assert!(!cart.remove(Uuid::new_v4(), kept_id));
    }

    #[test]
    fn sessions_are_isolated() {
        let cart = GuestCart::new();
        let now = Utc::now();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        cart.append(a, reservation(now));
        assert!(cart.list(b, now).is_empty());
        assert_eq!(cart.list(a, now).len(), 1);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let cart = GuestCart::new();
        let session = Uuid::new_v4();
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cart = cart.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    cart.append(session, reservation(now));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cart.list(session, now).len(), 400);
    }
}
