//! Settlement Recorder — turns verified external transfers into exactly one
//! local credit.
//!
//! The flow for a claim is: validate against the offering, park a `pending`
//! record keyed by the external hash, ask the ledger gateway for finality,
//! and on confirmation atomically credit the position and the offering
//! aggregate. The unique constraint on `transfers.external_hash` plus the
//! guarded `pending → confirmed` flip make the economic effect exactly-once
//! no matter how often a claim is retried or how many submissions race.

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::db;
use crate::errors::{EngineError, Result};
use crate::gateway::LedgerGateway;
use crate::models::{OfferingStatus, TransferRecord, TransferStatus};
use crate::positions;

/// A claimed external transfer as submitted by an investor.
#[derive(Debug, Clone)]
pub struct TransferClaim {
    pub investor: String,
    pub offering_id: i64,
    pub amount: f64,
    pub external_hash: String,
}

/// Record a claimed transfer against an offering.
///
/// * Gateway unavailability is not an error for the caller: the claim stays
///   `pending` and the reconciler resolves it later, so user-facing retries
///   are safe.
/// * A duplicate hash for the same claim returns the existing record without
///   a second credit. A hash bound to a different claim is rejected.
pub async fn record_transfer(
    pool: &SqlitePool,
    gateway: &dyn LedgerGateway,
    claim: &TransferClaim,
) -> Result<TransferRecord> {
    let offering = db::get_offering(pool, claim.offering_id).await?;
    if offering.status != OfferingStatus::Active {
        return Err(EngineError::OfferingNotOpen(offering.id));
    }
    if claim.amount <= 0.0 || claim.amount < offering.minimum_investment {
        return Err(EngineError::BelowMinimumContribution {
            amount: claim.amount,
            minimum: offering.minimum_investment,
        });
    }

    // Park the claim first; the unique hash constraint absorbs concurrent
    // duplicate submissions at the storage layer.
    sqlx::query(
        r#"
        INSERT INTO transfers (investor, offering_id, amount, external_hash, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (external_hash) DO NOTHING
        "#,
    )
    .bind(&claim.investor)
    .bind(claim.offering_id)
    .bind(claim.amount)
    .bind(&claim.external_hash)
    .bind(db::now())
    .execute(pool)
    .await?;

    let record = get_by_hash(pool, &claim.external_hash).await?;

    if record.investor != claim.investor
        || record.offering_id != claim.offering_id
        || !amounts_equal(record.amount, claim.amount)
    {
        error!(
            hash = %claim.external_hash,
            "duplicate external hash submitted with a different claim"
        );
        return Err(EngineError::HashAlreadyBound(claim.external_hash.clone()));
    }

    match record.status {
        // Immutable once confirmed: idempotent no-op.
        TransferStatus::Confirmed => Ok(record),
        // A failed claim is not retriable under the same hash; any retry
        // must mint a new claim with a new hash.
        TransferStatus::Failed => Err(EngineError::HashAlreadyBound(claim.external_hash.clone())),
        TransferStatus::Pending => match resolve_pending(pool, gateway, &record).await {
            Ok(resolved) => Ok(resolved),
            Err(EngineError::Gateway(e)) => {
                warn!(hash = %record.external_hash, "gateway unavailable, claim left pending: {e}");
                Ok(record)
            }
            Err(EngineError::Rpc { code, message }) => {
                warn!(
                    hash = %record.external_hash,
                    "gateway rpc error {code} ({message}), claim left pending"
                );
                Ok(record)
            }
            Err(e) => Err(e),
        },
    }
}

/// Try to settle one `pending` transfer record against the ledger.
///
/// Shared between the recorder hot path and the reconciler backstop.
/// Returns the record unchanged when the ledger does not know the hash yet.
pub async fn resolve_pending(
    pool: &SqlitePool,
    gateway: &dyn LedgerGateway,
    record: &TransferRecord,
) -> Result<TransferRecord> {
    let Some(finality) = gateway.query_finality(&record.external_hash).await? else {
        return Ok(record.clone());
    };

    if !amounts_equal(finality.amount, record.amount) {
        // Fatal for this claim only; the rest of the pipeline keeps going.
        mark_failed(pool, record.id).await?;
        error!(
            hash = %record.external_hash,
            claimed = record.amount,
            settled = finality.amount,
            "claimed amount does not match ledger-settled amount"
        );
        return Err(EngineError::AmountMismatch {
            claimed: record.amount,
            settled: finality.amount,
        });
    }

    confirm_and_credit(pool, record).await
}

/// Flip `pending → confirmed` and apply the credit to the position and the
/// offering aggregate in one transaction.
///
/// The flip is guarded on the prior status: if a concurrent caller already
/// confirmed the record, this applies no credit and returns the stored row.
async fn confirm_and_credit(pool: &SqlitePool, record: &TransferRecord) -> Result<TransferRecord> {
    let mut tx = pool.begin().await?;

    let flipped = sqlx::query("UPDATE transfers SET status = 'confirmed' WHERE id = ?1 AND status = 'pending'")
        .bind(record.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if flipped == 0 {
        tx.rollback().await?;
        return get_by_hash(pool, &record.external_hash).await;
    }

    positions::credit(&mut *tx, &record.investor, record.offering_id, record.amount).await?;

    // Atomic increment with the funded-threshold flip folded into the same
    // statement, so concurrent credits cannot lose an update or regress the
    // status.
    sqlx::query(
        r#"
        UPDATE offerings
        SET    total_raised = total_raised + ?1,
               status = CASE
                            WHEN status = 'active' AND total_raised + ?1 >= target_amount
                            THEN 'funded'
                            ELSE status
                        END,
               updated_at = ?2
        WHERE  id = ?3
        "#,
    )
    .bind(record.amount)
    .bind(db::now())
    .bind(record.offering_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        hash = %record.external_hash,
        offering = record.offering_id,
        amount = record.amount,
        "transfer confirmed and credited"
    );
    get_by_hash(pool, &record.external_hash).await
}

async fn mark_failed(pool: &SqlitePool, transfer_id: i64) -> Result<()> {
    sqlx::query("UPDATE transfers SET status = 'failed' WHERE id = ?1 AND status = 'pending'")
        .bind(transfer_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_by_hash(pool: &SqlitePool, external_hash: &str) -> Result<TransferRecord> {
    sqlx::query_as::<_, TransferRecord>("SELECT * FROM transfers WHERE external_hash = ?1")
        .bind(external_hash)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("transfer {external_hash}")))
}

/// Most recent transfers for one investor, capped at 50.
pub async fn investor_history(pool: &SqlitePool, investor: &str) -> Result<Vec<TransferRecord>> {
    let rows = sqlx::query_as::<_, TransferRecord>(
        r#"
        SELECT *
        FROM   transfers
        WHERE  investor = ?1
        ORDER  BY recorded_at DESC, id DESC
        LIMIT  50
        "#,
    )
    .bind(investor)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All unresolved claims, oldest first. Consumed by the reconciler.
pub async fn pending_transfers(pool: &SqlitePool) -> Result<Vec<TransferRecord>> {
    let rows = sqlx::query_as::<_, TransferRecord>(
        "SELECT * FROM transfers WHERE status = 'pending' ORDER BY recorded_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Stablecoin amounts are carried as decimals with 2 significant places;
/// compare with a tolerance well under a cent.
pub(crate) fn amounts_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
