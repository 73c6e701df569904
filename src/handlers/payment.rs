//! Payment-backed checkout.
//!
//! Intent creation stashes the store id and quantity in the gateway's
//! metadata; confirmation reads them back, so the two halves of the flow
//! correlate without any server-side pending state. The gateway is never
//! called while a database transaction is open.

use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    handlers::reservations,
    middleware::Customer,
    models::{Reservation, ReservationRequest},
    services::payments::{self, IntentMetadata},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub store_id: String,
    pub quantity: i32,
    pub total_amount: Decimal,
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    _customer: Customer,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.store_id.is_empty() {
        return Err(ApiError::Validation("Store ID is required".to_string()));
    }
    if req.quantity < 1 {
        return Err(ApiError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }
    let amount_cents = payments::to_cents(req.total_amount).ok_or_else(|| {
        ApiError::Validation("Total amount must be a non-negative amount".to_string())
    })?;

    // Admission control happens here, before any money moves. The confirm
    // path stays lenient: once the charge succeeded, inventory is the only
    // remaining constraint.
    let store = reservations::fetch_store(&state.db, &req.store_id).await?;
    reservations::ensure_selling(&store)?;

    let metadata = IntentMetadata {
        store_id: req.store_id,
        quantity: req.quantity,
    };

    let intent = state.payments.create_intent(amount_cents, &metadata).await?;

    Ok(Json(json!({
        "clientSecret": intent.client_secret,
        "paymentIntentId": intent.id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    customer: Customer,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.payment_intent_id.is_empty() {
        return Err(ApiError::Validation(
            "Payment intent ID is required".to_string(),
        ));
    }

    let intent = state.payments.get_intent(&req.payment_intent_id).await?;
    if !intent.succeeded() {
        return Err(ApiError::PaymentNotCompleted);
    }

    let store = reservations::fetch_store(&state.db, &intent.metadata.store_id).await?;

    let input = reservations::ReservationInput {
        customer_id: Some(customer.id),
        quantity: intent.metadata.quantity,
        total_amount: payments::from_cents(intent.amount_cents),
        // The gateway reference is the idempotency key: confirming the same
        // intent twice returns the first reservation and debits nothing.
        payment_ref: intent.id.clone(),
        pickup_time: store.pickup_window.clone(),
        customer_name: customer.email.clone(),
        customer_email: customer.email.clone(),
        customer_phone: String::new(),
    };

    let (reservation, created) =
        reservations::create_confirmed(&state.db, &store, input).await?;
    if created {
        reservations::notify(&state, &store, &reservation);
    }

    Ok(Json(json!({
        "status": "success",
        "reservation": reservation,
    })))
}

/// The customer pays in person at pickup; no gateway involved, so the
/// reservation is created confirmed with a synthetic payment marker.
pub async fn confirm_pay_at_store(
    State(state): State<AppState>,
    customer: Customer,
    Json(req): Json<ReservationRequest>,
) -> Result<Json<Value>, ApiError> {
    let reservation: Reservation =
        reservations::create_for_customer(&state, &customer, &req).await?;

    Ok(Json(json!({
        "status": "success",
        "reservation": reservation,
    })))
}
