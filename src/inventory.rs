//! Inventory ledger for store bag counters.
//!
//! Every store has one `available_units` counter shared by all customers.
//! The floor check and the decrement must land as a single conditional
//! update: decrementing first and flooring at zero lets N concurrent
//! requests against a store with one bag left all observe stock and all
//! proceed. Here, zero affected rows IS the out-of-stock signal.
//!
//! Both operations are generic over the executor so callers can run them
//! inside the same transaction as the reservation insert or delete.

use sqlx::PgExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    InsufficientInventory,
}

/// Atomically take `quantity` units from a store's counter.
///
/// Commits the decrement only if `available_units >= quantity` still holds
/// at commit time. Rows from other stores are never touched, so requests
/// against different stores do not serialize against each other.
pub async fn reserve<'e, E>(
    executor: E,
    store_id: &str,
    quantity: i32,
) -> Result<ReserveOutcome, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE stores
        SET available_units = available_units - $1, updated_at = NOW()
        WHERE id = $2 AND available_units >= $1
        "#,
    )
    .bind(quantity)
    .bind(store_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        Ok(ReserveOutcome::InsufficientInventory)
    } else {
        Ok(ReserveOutcome::Reserved)
    }
}

/// Give `quantity` units back to a store's counter.
///
/// Uncapped: returning capacity is always safe. A no-op if the store row no
/// longer exists, so cancelling a reservation for a deleted store succeeds.
pub async fn release<'e, E>(executor: E, store_id: &str, quantity: i32) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE stores
        SET available_units = available_units + $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(quantity)
    .bind(store_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        log::warn!(
            "Released {} units for missing store {}; nothing to restore",
            quantity,
            store_id
        );
    }

    Ok(())
}
