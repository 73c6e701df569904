//! Store-owner views of their store's reservations.

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiError,
    handlers::reservations::view_query,
    middleware::Customer,
    models::{ReservationStatus, ReservationView},
    state::AppState,
    window::{self, Buckets},
};

/// Every reservation against the caller's store, guests included, split
/// into the same current/past window buckets customers see. An owner
/// without a store gets empty buckets, not an error.
pub async fn list_store_reservations(
    State(state): State<AppState>,
    customer: Customer,
) -> Result<Json<Buckets<ReservationView>>, ApiError> {
    let store_id: Option<String> = sqlx::query_scalar("SELECT id FROM stores WHERE owner_id = $1")
        .bind(customer.id)
        .fetch_optional(&state.db)
        .await?;

    let Some(store_id) = store_id else {
        log::warn!("No store found for owner {}", customer.id);
        return Ok(Json(Buckets::empty()));
    };

    let rows = sqlx::query_as::<_, ReservationView>(&view_query("r.store_id = $1"))
        .bind(&store_id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(window::classify(rows, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Advance a reservation through the state machine (e.g. mark a pickup
/// completed). Only forward transitions are accepted, and inventory is
/// never touched: the bags were deducted when the reservation confirmed.
pub async fn update_reservation_status(
    State(state): State<AppState>,
    customer: Customer,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let next: ReservationStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::Validation(format!("Unknown status '{}'", req.status)))?;

    let row: Option<(String, Uuid)> = sqlx::query_as(
        r#"
        SELECT r.status, s.owner_id
        FROM reservations r
        JOIN stores s ON s.id = r.store_id
        WHERE r.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let Some((current_raw, owner_id)) = row else {
        return Err(ApiError::NotFound("Reservation"));
    };

    if owner_id != customer.id {
        return Err(ApiError::Unauthorized);
    }

    let current: ReservationStatus = current_raw
        .parse()
        .map_err(|_| ApiError::Dependency("Database error".to_string()))?;

    if !current.can_advance_to(next) {
        return Err(ApiError::InvalidTransition {
            from: current_raw,
            to: req.status,
        });
    }

    // Guard on the status we read so a concurrent update or delete cannot
    // be silently overwritten.
    let updated = sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2 AND status = $3")
        .bind(next.as_str())
        .bind(id)
        .bind(current.as_str())
        .execute(&state.db)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::InvalidTransition {
            from: current_raw,
            to: req.status,
        });
    }

    log::info!("Reservation {} moved to status {}", id, next);
    Ok(Json(json!({
        "message": "Reservation status updated",
        "status": next.as_str(),
    })))
}
