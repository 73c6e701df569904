//! Reservation lifecycle: checkout, listing, and cancellation.
//!
//! Every creation path funnels through [`create_confirmed`], which inserts
//! the reservation row and debits the inventory ledger in one transaction.
//! Either both land or neither does; "reserved but never persisted" is the
//! one state that must never stand.

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    cart,
    database::Database,
    error::ApiError,
    inventory::{self, ReserveOutcome},
    middleware::Customer,
    models::{Reservation, ReservationRequest, ReservationStatus, ReservationView, Store},
    services::{notifications, ReservationSummary},
    state::AppState,
    window::{self, Buckets},
};

pub(crate) fn validate_request(req: &ReservationRequest) -> Result<(), ApiError> {
    if req.store_id.is_empty() {
        return Err(ApiError::Validation("Store ID is required".to_string()));
    }
    if req.quantity < 1 {
        return Err(ApiError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }
    if req.total_amount.is_sign_negative() {
        return Err(ApiError::Validation(
            "Total amount cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Guests have no account to reach them through, so they must leave at
/// least one contact method.
pub(crate) fn validate_guest_contact(req: &ReservationRequest) -> Result<(), ApiError> {
    let has_email = req.email.as_deref().is_some_and(|e| !e.is_empty());
    let has_phone = req.phone.as_deref().is_some_and(|p| !p.is_empty());
    if !has_email && !has_phone {
        return Err(ApiError::Validation(
            "An email or phone number is required".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn fetch_store(db: &Database, store_id: &str) -> Result<Store, ApiError> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
        .bind(store_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Store"))
}

pub(crate) async fn find_by_payment_ref(
    db: &Database,
    payment_ref: &str,
) -> Result<Reservation, ApiError> {
    sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE payment_ref = $1")
        .bind(payment_ref)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Reservation"))
}

pub(crate) fn ensure_selling(store: &Store) -> Result<(), ApiError> {
    if !store.is_selling {
        return Err(ApiError::Validation(
            "Store is not currently selling".to_string(),
        ));
    }
    Ok(())
}

pub(crate) struct ReservationInput {
    pub customer_id: Option<Uuid>,
    pub quantity: i32,
    pub total_amount: rust_decimal::Decimal,
    pub payment_ref: String,
    pub pickup_time: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

/// Insert a confirmed reservation and debit the store's counter, atomically.
///
/// The insert uses the `payment_ref` uniqueness as an idempotency key: a
/// replayed payment confirmation hits the conflict, debits nothing, and
/// gets the reservation the first call created. Returns the reservation and
/// whether this call created it.
pub(crate) async fn create_confirmed(
    db: &Database,
    store: &Store,
    input: ReservationInput,
) -> Result<(Reservation, bool), ApiError> {
    let reservation = Reservation {
        id: Uuid::new_v4(),
        customer_id: input.customer_id,
        store_id: store.id.clone(),
        quantity: input.quantity,
        total_amount: input.total_amount,
        status: ReservationStatus::Confirmed.as_str().to_string(),
        payment_ref: input.payment_ref,
        pickup_time: input.pickup_time.or_else(|| store.pickup_window.clone()),
        pickup_timestamp: store.pickup_timestamp,
        created_at: Utc::now(),
        customer_name: input.customer_name,
        customer_email: input.customer_email,
        customer_phone: input.customer_phone,
    };

    let mut tx = db.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO reservations (
            id, customer_id, store_id, quantity, total_amount, status, payment_ref,
            pickup_time, pickup_timestamp, created_at,
            customer_name, customer_email, customer_phone
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (payment_ref) DO NOTHING
        "#,
    )
    .bind(reservation.id)
    .bind(reservation.customer_id)
    .bind(&reservation.store_id)
    .bind(reservation.quantity)
    .bind(reservation.total_amount)
    .bind(&reservation.status)
    .bind(&reservation.payment_ref)
    .bind(&reservation.pickup_time)
    .bind(reservation.pickup_timestamp)
    .bind(reservation.created_at)
    .bind(&reservation.customer_name)
    .bind(&reservation.customer_email)
    .bind(&reservation.customer_phone)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        // Replayed confirmation; hand back what the first call created. The
        // original can be deleted between the rollback and this read, which
        // surfaces as NotFound rather than a storage failure.
        tx.rollback().await?;
        log::info!(
            "Payment reference {} already confirmed; returning existing reservation",
            reservation.payment_ref
        );
        let existing = find_by_payment_ref(db, &reservation.payment_ref).await?;
        return Ok((existing, false));
    }

    match inventory::reserve(&mut *tx, &store.id, input.quantity).await? {
        ReserveOutcome::InsufficientInventory => {
            tx.rollback().await?;
            Err(ApiError::OutOfStock)
        }
        ReserveOutcome::Reserved => {
            tx.commit().await?;
            log::info!(
                "Reservation {} created for store {} ({} bags)",
                reservation.id,
                store.id,
                reservation.quantity
            );
            Ok((reservation, true))
        }
    }
}

/// Dispatch the confirmation message on a detached task. The reservation
/// has already committed; delivery failures are logged, never surfaced.
pub(crate) fn notify(state: &AppState, store: &Store, reservation: &Reservation) {
    let summary = ReservationSummary {
        reservation_id: reservation.id.to_string(),
        customer_name: reservation.customer_name.clone(),
        store_name: store.title.clone(),
        store_address: store.address.clone(),
        quantity: reservation.quantity,
        total_amount: reservation.total_amount,
        pickup_time: reservation.pickup_time.clone().unwrap_or_default(),
        email: reservation.customer_email.clone(),
        phone: reservation.customer_phone.clone(),
    };
    notifications::dispatch_confirmation(state.notifier.clone(), summary);
}

/// Shared by the authenticated checkout and the pay-at-store confirmation.
pub(crate) async fn create_for_customer(
    state: &AppState,
    customer: &Customer,
    req: &ReservationRequest,
) -> Result<Reservation, ApiError> {
    validate_request(req)?;
    let store = fetch_store(&state.db, &req.store_id).await?;
    ensure_selling(&store)?;

    let input = ReservationInput {
        customer_id: Some(customer.id),
        quantity: req.quantity,
        total_amount: req.total_amount,
        payment_ref: format!("store-pay-{}", Uuid::new_v4()),
        pickup_time: req.pickup_time.clone(),
        customer_name: req.name.clone().unwrap_or_else(|| customer.email.clone()),
        customer_email: req.email.clone().unwrap_or_else(|| customer.email.clone()),
        customer_phone: req.phone.clone().unwrap_or_default(),
    };

    let (reservation, created) = create_confirmed(&state.db, &store, input).await?;
    if created {
        notify(state, &store, &reservation);
    }
    Ok(reservation)
}

pub async fn create_reservation(
    State(state): State<AppState>,
    customer: Customer,
    Json(req): Json<ReservationRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = create_for_customer(&state, &customer, &req).await?;
    Ok(Json(reservation))
}

pub async fn create_guest_reservation(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<ReservationRequest>,
) -> Result<Json<Reservation>, ApiError> {
    validate_request(&req)?;
    validate_guest_contact(&req)?;
    let store = fetch_store(&state.db, &req.store_id).await?;
    ensure_selling(&store)?;

    let input = ReservationInput {
        customer_id: None,
        quantity: req.quantity,
        total_amount: req.total_amount,
        payment_ref: format!("guest-pay-{}", Uuid::new_v4()),
        pickup_time: req.pickup_time.clone(),
        customer_name: req.name.clone().unwrap_or_else(|| "Guest".to_string()),
        customer_email: req.email.clone().unwrap_or_default(),
        customer_phone: req.phone.clone().unwrap_or_default(),
    };

    let (reservation, created) = create_confirmed(&state.db, &store, input).await?;
    if created {
        // Mirror into the session cart so the guest's own list needs no
        // database hit. The durable row remains the source of truth.
        let session = cart::session_token(&cookies);
        state.cart.append(session, reservation.clone());
        notify(&state, &store, &reservation);
    }
    Ok(Json(reservation))
}

pub(crate) fn view_query(filter: &str) -> String {
    format!(
        r#"
        SELECT
            r.id, r.store_id,
            s.title AS store_name, s.address AS store_address,
            r.quantity, r.total_amount, r.status, r.payment_ref,
            r.pickup_time, r.pickup_timestamp, r.created_at,
            s.original_price, s.discounted_price,
            r.customer_name, r.customer_email, r.customer_phone
        FROM reservations r
        JOIN stores s ON s.id = r.store_id
        WHERE {}
        ORDER BY r.created_at DESC
        "#,
        filter
    )
}

pub async fn list_reservations(
    State(state): State<AppState>,
    customer: Customer,
) -> Result<Json<Buckets<ReservationView>>, ApiError> {
    let rows = sqlx::query_as::<_, ReservationView>(&view_query("r.customer_id = $1"))
        .bind(customer.id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(window::classify(rows, Utc::now())))
}

pub async fn list_guest_reservations(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<Buckets<Reservation>>, ApiError> {
    let session = cart::session_token(&cookies);
    let reservations = state.cart.list(session, Utc::now());
    Ok(Json(window::classify(reservations, Utc::now())))
}

pub async fn delete_reservation(
    State(state): State<AppState>,
    customer: Customer,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let mut tx = state.db.begin().await?;

    // DELETE .. RETURNING reads and removes in one statement; zero rows
    // means someone else already deleted it, and nothing gets released.
    let deleted: Option<(String, i32)> = sqlx::query_as(
        "DELETE FROM reservations WHERE id = $1 AND customer_id = $2 RETURNING store_id, quantity",
    )
    .bind(id)
    .bind(customer.id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((store_id, quantity)) = deleted else {
        return Err(ApiError::NotFound("Reservation"));
    };

    inventory::release(&mut *tx, &store_id, quantity).await?;
    tx.commit().await?;

    log::info!(
        "Reservation {} deleted; released {} bags to store {}",
        id,
        quantity,
        store_id
    );
    Ok(Json(json!({ "message": "Reservation deleted" })))
}

pub async fn delete_guest_reservation(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let session = cart::session_token(&cookies);

    // The session cart doubles as the guest's proof of ownership.
    if !state.cart.contains(session, id) {
        return Err(ApiError::NotFound("Reservation"));
    }

    let mut tx = state.db.begin().await?;
    let deleted: Option<(String, i32)> = sqlx::query_as(
        "DELETE FROM reservations WHERE id = $1 AND customer_id IS NULL RETURNING store_id, quantity",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((store_id, quantity)) = deleted else {
        // Row already gone; drop the stale cart entry but release nothing.
        state.cart.remove(session, id);
        return Err(ApiError::NotFound("Reservation"));
    };

    inventory::release(&mut *tx, &store_id, quantity).await?;
    tx.commit().await?;
    state.cart.remove(session, id);

    log::info!(
        "Guest reservation {} deleted; released {} bags to store {}",
        id,
        quantity,
        store_id
    );
    Ok(Json(json!({ "message": "Reservation deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn request() -> ReservationRequest {
        serde_json::from_value(json!({
            "storeId": "store-1",
            "quantity": 1,
            "totalAmount": "9.99"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_a_minimal_valid_request() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn rejects_missing_store_id() {
        let mut req = request();
        req.store_id = String::new();
        assert!(matches!(
            validate_request(&req),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let mut req = request();
        req.quantity = 0;
        assert!(matches!(
            validate_request(&req),
            Err(ApiError::Validation(_))
        ));

        req.quantity = -3;
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn rejects_negative_amount() {
        let mut req = request();
        req.total_amount = Decimal::new(-1, 2);
        assert!(validate_request(&req).is_err());
    }

    fn store(is_selling: bool) -> Store {
        Store {
            id: "store-1".to_string(),
            owner_id: Uuid::new_v4(),
            title: "Corner Bakery".to_string(),
            address: "12 Elm St".to_string(),
            available_units: 5,
            unit_price: None,
            original_price: None,
            discounted_price: None,
            is_selling,
            pickup_window: None,
            pickup_timestamp: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn closed_store_admits_no_reservations() {
        assert!(matches!(
            ensure_selling(&store(false)),
            Err(ApiError::Validation(_))
        ));
        assert!(ensure_selling(&store(true)).is_ok());
    }

    async fn seed_store(db: &Database, units: i32) -> Store {
        let id = format!("store-{}", Uuid::new_v4());
        sqlx::query(
            r#"
            INSERT INTO stores (id, owner_id, title, address, available_units, is_selling)
            VALUES ($1, $2, 'Test Bakery', '1 Main St', $3, true)
            "#,
        )
        .bind(&id)
        .bind(Uuid::new_v4())
        .bind(units)
        .execute(db)
        .await
        .expect("seed store");

        fetch_store(db, &id).await.expect("fetch seeded store")
    }

    fn input(payment_ref: &str) -> ReservationInput {
        ReservationInput {
            customer_id: None,
            quantity: 1,
            total_amount: Decimal::new(500, 2),
            payment_ref: payment_ref.to_string(),
            pickup_time: None,
            customer_name: "Guest".to_string(),
            customer_email: "guest@example.com".to_string(),
            customer_phone: String::new(),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn replayed_confirmation_debits_inventory_once() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = sqlx::PgPool::connect(&url).await.expect("connect");
        let store = seed_store(&db, 3).await;
        let payment_ref = format!("pi_{}", Uuid::new_v4());

        let (first, created) = create_confirmed(&db, &store, input(&payment_ref))
            .await
            .expect("first confirmation");
        assert!(created);

        let (second, created) = create_confirmed(&db, &store, input(&payment_ref))
            .await
            .expect("replayed confirmation");
        assert!(!created);
        assert_eq!(second.id, first.id);

        let units: i32 = sqlx::query_scalar("SELECT available_units FROM stores WHERE id = $1")
            .bind(&store.id)
            .fetch_one(&db)
            .await
            .expect("fetch units");
        assert_eq!(units, 2);

        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE payment_ref = $1",
        )
        .bind(&payment_ref)
        .fetch_one(&db)
        .await
        .expect("count rows");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn unknown_payment_ref_reads_as_not_found() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = sqlx::PgPool::connect(&url).await.expect("connect");

        let result = find_by_payment_ref(&db, &format!("pi_{}", Uuid::new_v4())).await;
        assert!(matches!(result, Err(ApiError::NotFound("Reservation"))));
    }

    #[test]
    fn guest_needs_some_contact_method() {
        let mut req = request();
        assert!(validate_guest_contact(&req).is_err());

        req.email = Some(String::new());
        assert!(validate_guest_contact(&req).is_err());

        req.email = Some("guest@example.com".to_string());
        assert!(validate_guest_contact(&req).is_ok());

        req.email = None;
        req.phone = Some("+15550100".to_string());
        assert!(validate_guest_contact(&req).is_ok());
    }
}
