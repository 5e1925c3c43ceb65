//! Position Ledger — per-(investor, offering) stakes and offering aggregates.
//!
//! All value mutations are single guarded SQL statements: the negative-
//! balance check rides on the `UPDATE`'s `WHERE` clause so two concurrent
//! deductions can never both observe the same prior balance and drive a
//! position negative.

use serde::Serialize;
use sqlx::{Sqlite, SqlitePool};

use crate::db;
use crate::errors::{EngineError, Result};
use crate::models::Position;

pub async fn get_position(
    pool: &SqlitePool,
    investor: &str,
    offering_id: i64,
) -> Result<Option<Position>> {
    let row = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE investor = ?1 AND offering_id = ?2",
    )
    .bind(investor)
    .bind(offering_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// All positions held by one investor, largest stake first.
pub async fn list_positions(pool: &SqlitePool, investor: &str) -> Result<Vec<Position>> {
    let rows = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE investor = ?1 ORDER BY current_value DESC, offering_id ASC",
    )
    .bind(investor)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Sum of current values across all of an investor's positions. Withdrawals
/// draw from this aggregate, not from any single position.
pub async fn investor_balance(pool: &SqlitePool, investor: &str) -> Result<f64> {
    let (total,): (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(current_value), 0.0) FROM positions WHERE investor = ?1",
    )
    .bind(investor)
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Add a confirmed contribution to a position, creating it on first
/// transfer. Runs against the caller's executor so the settlement recorder
/// can fold it into its transaction.
pub async fn credit<'e, E>(executor: E, investor: &str, offering_id: i64, amount: f64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO positions (investor, offering_id, principal, current_value, updated_at)
        VALUES (?1, ?2, ?3, ?3, ?4)
        ON CONFLICT (investor, offering_id) DO UPDATE SET
            principal     = principal + excluded.principal,
            current_value = current_value + excluded.current_value,
            updated_at    = excluded.updated_at
        "#,
    )
    .bind(investor)
    .bind(offering_id)
    .bind(amount)
    .bind(db::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a signed delta to a position's current value.
///
/// The guard `current_value + delta >= 0` is part of the statement itself;
/// a rejected deduction signals [`EngineError::InsufficientBalance`] and
/// leaves the row untouched.
pub async fn adjust(
    pool: &SqlitePool,
    investor: &str,
    offering_id: i64,
    delta: f64,
) -> Result<Position> {
    let updated = sqlx::query(
        r#"
        UPDATE positions
        SET    current_value = current_value + ?3,
               updated_at    = ?4
        WHERE  investor = ?1 AND offering_id = ?2
          AND  current_value + ?3 >= 0
        "#,
    )
    .bind(investor)
    .bind(offering_id)
    .bind(delta)
    .bind(db::now())
    .execute(pool)
    .await?
    .rows_affected();

    let position = get_position(pool, investor, offering_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("position {investor}/{offering_id}")))?;

    if updated == 0 {
        return Err(EngineError::InsufficientBalance {
            available: position.current_value,
            requested: -delta,
        });
    }
    Ok(position)
}

/// Offering-level aggregate used by reconciliation and reporting. `raised`
/// is derived from confirmed transfer records, never from the cached
/// counter on the offering row.
#[derive(Debug, Clone, Serialize)]
pub struct OfferingAggregate {
    pub raised: f64,
    pub positions_count: i64,
}

pub async fn aggregate(pool: &SqlitePool, offering_id: i64) -> Result<OfferingAggregate> {
    let (raised,): (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0.0) FROM transfers WHERE offering_id = ?1 AND status = 'confirmed'",
    )
    .bind(offering_id)
    .fetch_one(pool)
    .await?;

    let (positions_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM positions WHERE offering_id = ?1")
            .bind(offering_id)
            .fetch_one(pool)
            .await?;

    Ok(OfferingAggregate {
        raised,
        positions_count,
    })
}
