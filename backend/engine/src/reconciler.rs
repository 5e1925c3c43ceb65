//! Long-running background task that repairs drift between the off-ledger
//! cache and ledger-confirmed truth.
//!
//! Two jobs per tick: resolve `pending` transfer claims whose finality the
//! hot path could not establish, and re-derive each offering's raised total
//! from its confirmed transfer records. Aggregates are rebuilt from the
//! local record set, never from raw ledger balances, so a transfer already
//! reflected locally can't be double-counted. A tick with no new ledger
//! activity performs zero writes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db;
use crate::errors::{EngineError, Result};
use crate::gateway::LedgerGateway;
use crate::positions;
use crate::settlement::{self, amounts_equal};

pub struct ReconcilerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub gateway: Arc<dyn LedgerGateway>,
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub transfers_confirmed: usize,
    pub transfers_failed: usize,
    pub aggregates_repaired: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == ReconcileReport::default()
    }
}

/// Spawn the reconciliation loop as a background [`tokio`] task.
pub async fn run(state: Arc<ReconcilerState>) {
    info!(
        interval_secs = state.config.reconcile_interval_secs,
        "Reconciler starting"
    );

    loop {
        match reconcile_all(&state.pool, state.gateway.as_ref()).await {
            Ok(report) if report.is_clean() => debug!("Reconcile tick: no drift"),
            Ok(report) => info!(
                confirmed = report.transfers_confirmed,
                failed = report.transfers_failed,
                repaired = report.aggregates_repaired,
                "Reconcile tick applied corrections"
            ),
            Err(e) => error!("Reconcile tick error: {e}"),
        }

        tokio::time::sleep(Duration::from_secs(state.config.reconcile_interval_secs)).await;
    }
}

/// One full reconciliation pass over every tracked offering.
pub async fn reconcile_all(
    pool: &SqlitePool,
    gateway: &dyn LedgerGateway,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for transfer in settlement::pending_transfers(pool).await? {
        match settlement::resolve_pending(pool, gateway, &transfer).await {
            Ok(resolved) => {
                if resolved.status == crate::models::TransferStatus::Confirmed {
                    report.transfers_confirmed += 1;
                }
            }
            Err(EngineError::AmountMismatch { .. }) => {
                // Already marked failed; fatal for that claim only.
                report.transfers_failed += 1;
            }
            Err(EngineError::Gateway(e)) => {
                warn!(hash = %transfer.external_hash, "gateway unavailable during reconcile: {e}");
            }
            Err(e) => error!(hash = %transfer.external_hash, "reconcile of claim failed: {e}"),
        }
    }

    let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM offerings ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    for (id,) in ids {
        if reconcile_offering(pool, gateway, id).await? {
            report.aggregates_repaired += 1;
        }
    }

    Ok(report)
}

/// Re-derive one offering's raised total from its confirmed transfer
/// records and repair the cached counter if it diverged. Returns whether a
/// correction was written.
pub async fn reconcile_offering(
    pool: &SqlitePool,
    gateway: &dyn LedgerGateway,
    offering_id: i64,
) -> Result<bool> {
    let offering = db::get_offering(pool, offering_id).await?;
    let derived = positions::aggregate(pool, offering_id).await?;

    let mut repaired = false;
    if !amounts_equal(offering.total_raised, derived.raised) {
        warn!(
            offering = offering_id,
            cached = offering.total_raised,
            derived = derived.raised,
            "raised total diverged from confirmed transfers, repairing"
        );
        // Status may move forward to funded here, but never regresses.
        sqlx::query(
            r#"
            UPDATE offerings
            SET    total_raised = ?1,
                   status = CASE
                                WHEN status = 'active' AND ?1 >= target_amount THEN 'funded'
                                ELSE status
                            END,
                   updated_at = ?2
            WHERE  id = ?3
            "#,
        )
        .bind(derived.raised)
        .bind(db::now())
        .bind(offering_id)
        .execute(pool)
        .await?;
        repaired = true;
    }

    // Cross-check the escrow account when we know its address. Log-only:
    // raw ledger balances are a drift signal, never a source of truth for
    // the cache.
    if let Some(address) = &offering.escrow_address {
        match gateway.query_account_state(address).await {
            Ok(account) if !amounts_equal(account.balance, derived.raised) => warn!(
                offering = offering_id,
                escrow = %address,
                ledger_balance = account.balance,
                derived = derived.raised,
                "escrow balance differs from confirmed transfer sum"
            ),
            Ok(_) => {}
            Err(e) => warn!(offering = offering_id, "escrow state query failed: {e}"),
        }
    }

    Ok(repaired)
}
