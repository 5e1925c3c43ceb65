//! Vetting Tracker — the ordered administrative approval checklist on an
//! offering. Independent of the funding lifecycle.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;
use crate::errors::{EngineError, Result};
use crate::models::{Offering, VettingStage, VettingStatus};

/// Upsert a named vetting stage. Stages are created lazily on their first
/// status update; a `completed` stage gets a completion timestamp.
///
/// The single-`current` rule is a soft invariant owned by administrators,
/// not the storage layer; the tracker warns when it is violated.
pub async fn advance_stage(
    pool: &SqlitePool,
    offering_id: i64,
    stage_id: &str,
    label: &str,
    status: VettingStatus,
) -> Result<VettingStage> {
    // Stage list hangs off an offering; reject unknown offerings up front.
    db::get_offering(pool, offering_id).await?;

    let completed_at = (status == VettingStatus::Completed).then(db::now);

    sqlx::query(
        r#"
        INSERT INTO vetting_stages (offering_id, stage_id, label, status, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (offering_id, stage_id) DO UPDATE SET
            label        = excluded.label,
            status       = excluded.status,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(offering_id)
    .bind(stage_id)
    .bind(label)
    .bind(status)
    .bind(completed_at)
    .execute(pool)
    .await?;

    let (current_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM vetting_stages WHERE offering_id = ?1 AND status = 'current'",
    )
    .bind(offering_id)
    .fetch_one(pool)
    .await?;
    if current_count > 1 {
        warn!(
            offering = offering_id,
            current_count, "more than one vetting stage is marked current"
        );
    }

    sqlx::query_as::<_, VettingStage>(
        "SELECT * FROM vetting_stages WHERE offering_id = ?1 AND stage_id = ?2",
    )
    .bind(offering_id)
    .bind(stage_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| EngineError::NotFound(format!("vetting stage {stage_id}")))
}

/// Checklist for one offering, in stage-id order.
pub async fn list_stages(pool: &SqlitePool, offering_id: i64) -> Result<Vec<VettingStage>> {
    let rows = sqlx::query_as::<_, VettingStage>(
        "SELECT * FROM vetting_stages WHERE offering_id = ?1 ORDER BY stage_id ASC",
    )
    .bind(offering_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Administrative approval: flags the offering as vetted. The funding
/// status is owned by the settlement recorder and is not touched here.
pub async fn approve_offering(pool: &SqlitePool, offering_id: i64) -> Result<Offering> {
    let updated = sqlx::query("UPDATE offerings SET verified = 1, updated_at = ?2 WHERE id = ?1")
        .bind(offering_id)
        .bind(db::now())
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(EngineError::NotFound(format!("offering {offering_id}")));
    }
    info!(offering = offering_id, "offering approved by admin");
    db::get_offering(pool, offering_id).await
}
