//! Withdrawal Engine — the payout request state machine.
//!
//! `pending → approved → processed`, with cancellation legal only from
//! `pending`/`approved` and `failed` only out of `approved` when the
//! deduction cannot be covered. Processing deducts the gross amount from
//! the investor's aggregate holdings inside one transaction: positions are
//! drained largest-first until the amount is covered, and an uncoverable
//! deduction rolls back whole.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;
use crate::errors::{EngineError, Result};
use crate::models::{
    BankDetails, MobileMoneyDetails, PayoutChannel, WithdrawalRequest, WithdrawalStatus,
};
use crate::positions;

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalInput {
    pub investor: String,
    pub amount: f64,
    /// Raw channel string so an unknown channel surfaces as a domain error
    /// rather than a deserialization failure.
    pub channel: String,
    pub bank_details: Option<BankDetails>,
    pub mobile_money_details: Option<MobileMoneyDetails>,
}

/// Fee rounded to 2 decimal places: 1% mobile money, 2% bank transfer.
pub fn compute_fee(amount: f64, channel: PayoutChannel) -> f64 {
    (amount * channel.fee_rate() * 100.0).round() / 100.0
}

/// Create a `pending` withdrawal request.
///
/// Validation order: minimum floor, channel, channel details, then the
/// balance check against the sum of the investor's position values.
pub async fn request_withdrawal(
    pool: &SqlitePool,
    minimum_withdrawal: f64,
    input: &WithdrawalInput,
) -> Result<WithdrawalRequest> {
    if input.amount < minimum_withdrawal {
        return Err(EngineError::BelowMinimumWithdrawal {
            amount: input.amount,
            minimum: minimum_withdrawal,
        });
    }

    let channel = PayoutChannel::parse(&input.channel)
        .ok_or_else(|| EngineError::UnsupportedChannel(input.channel.clone()))?;

    if channel == PayoutChannel::BankTransfer && input.bank_details.is_none() {
        return Err(EngineError::MissingChannelDetails("bank_transfer".to_string()));
    }
    if channel.is_mobile_money() && input.mobile_money_details.is_none() {
        return Err(EngineError::MissingChannelDetails(
            input.channel.clone(),
        ));
    }

    let available = positions::investor_balance(pool, &input.investor).await?;
    if available < input.amount {
        return Err(EngineError::InsufficientBalance {
            available,
            requested: input.amount,
        });
    }

    let fee = compute_fee(input.amount, channel);
    let net_amount = input.amount - fee;
    let ts = db::now();

    let bank = input.bank_details.as_ref().filter(|_| channel == PayoutChannel::BankTransfer);
    let mobile = input
        .mobile_money_details
        .as_ref()
        .filter(|_| channel.is_mobile_money());

    let id = sqlx::query(
        r#"
        INSERT INTO withdrawals
            (investor, amount, channel, fee, net_amount, status,
             bank_name, account_number, account_holder,
             phone_number, provider_name, account_name,
             created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        "#,
    )
    .bind(&input.investor)
    .bind(input.amount)
    .bind(channel)
    .bind(fee)
    .bind(net_amount)
    .bind(bank.map(|b| b.bank_name.clone()))
    .bind(bank.map(|b| b.account_number.clone()))
    .bind(bank.map(|b| b.account_holder.clone()))
    .bind(mobile.map(|m| m.phone_number.clone()))
    .bind(mobile.map(|m| m.provider_name.clone()))
    .bind(mobile.map(|m| m.account_name.clone()))
    .bind(ts)
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(
        withdrawal = id,
        investor = %input.investor,
        amount = input.amount,
        channel = channel.as_str(),
        "withdrawal request created"
    );
    get_withdrawal(pool, id).await
}

/// `pending → approved`. Records the approver and an external payout
/// reference.
pub async fn approve(
    pool: &SqlitePool,
    id: i64,
    approver: &str,
    reference: Option<&str>,
) -> Result<WithdrawalRequest> {
    let request = get_withdrawal(pool, id).await?;
    if !request.status.can_transition(WithdrawalStatus::Approved) {
        return Err(illegal(request.status, WithdrawalStatus::Approved));
    }

    // Re-checked in the statement so a racing transition cannot slip by.
    let updated = sqlx::query(
        r#"
        UPDATE withdrawals
        SET    status = 'approved', approved_by = ?2, reference = ?3, updated_at = ?4
        WHERE  id = ?1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(approver)
    .bind(reference)
    .bind(db::now())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        let current = get_withdrawal(pool, id).await?;
        return Err(illegal(current.status, WithdrawalStatus::Approved));
    }
    get_withdrawal(pool, id).await
}

/// `approved → processed`, deducting the gross amount from the investor's
/// holdings.
///
/// The deduction and the status flip commit atomically. If the aggregate
/// balance no longer covers the amount the transaction rolls back, the
/// request is marked `failed`, and the funds are left untouched.
pub async fn process(pool: &SqlitePool, id: i64) -> Result<WithdrawalRequest> {
    let request = get_withdrawal(pool, id).await?;
    if !request.status.can_transition(WithdrawalStatus::Processed) {
        return Err(illegal(request.status, WithdrawalStatus::Processed));
    }

    let mut tx = pool.begin().await?;
    let ts = db::now();

    let claimed = sqlx::query(
        r#"
        UPDATE withdrawals
        SET    status = 'processed', processed_at = ?2, updated_at = ?2
        WHERE  id = ?1 AND status = 'approved'
        "#,
    )
    .bind(id)
    .bind(ts)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        tx.rollback().await?;
        let current = get_withdrawal(pool, id).await?;
        return Err(illegal(current.status, WithdrawalStatus::Processed));
    }

    // Drain positions largest-first until the gross amount is covered.
    let rows = sqlx::query_as::<_, (i64, f64)>(
        r#"
        SELECT offering_id, current_value
        FROM   positions
        WHERE  investor = ?1 AND current_value > 0
        ORDER  BY current_value DESC, offering_id ASC
        "#,
    )
    .bind(&request.investor)
    .fetch_all(&mut *tx)
    .await?;

    let mut remaining = request.amount;
    for (offering_id, current_value) in rows {
        if remaining <= 1e-6 {
            break;
        }
        let take = remaining.min(current_value);
        sqlx::query(
            r#"
            UPDATE positions
            SET    current_value = current_value - ?3, updated_at = ?4
            WHERE  investor = ?1 AND offering_id = ?2 AND current_value - ?3 >= 0
            "#,
        )
        .bind(&request.investor)
        .bind(offering_id)
        .bind(take)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
        remaining -= take;
    }

    if remaining > 1e-6 {
        tx.rollback().await?;
        let available = positions::investor_balance(pool, &request.investor).await?;
        warn!(
            withdrawal = id,
            available,
            requested = request.amount,
            "deduction could not be covered, marking withdrawal failed"
        );
        sqlx::query(
            r#"
            UPDATE withdrawals
            SET    status = 'failed', failure_reason = ?2, updated_at = ?3
            WHERE  id = ?1 AND status = 'approved'
            "#,
        )
        .bind(id)
        .bind(format!(
            "insufficient balance at processing time: available {available}, requested {}",
            request.amount
        ))
        .bind(db::now())
        .execute(pool)
        .await?;
        return Err(EngineError::InsufficientBalance {
            available,
            requested: request.amount,
        });
    }

    tx.commit().await?;
    info!(withdrawal = id, amount = request.amount, "withdrawal processed");
    get_withdrawal(pool, id).await
}

/// Cancellation, legal only from `pending`/`approved`. No balance effect:
/// nothing was deducted before `processed`.
pub async fn cancel(pool: &SqlitePool, id: i64, reason: Option<&str>) -> Result<WithdrawalRequest> {
    let request = get_withdrawal(pool, id).await?;
    if !request.status.can_transition(WithdrawalStatus::Cancelled) {
        return Err(illegal(request.status, WithdrawalStatus::Cancelled));
    }

    let updated = sqlx::query(
        r#"
        UPDATE withdrawals
        SET    status = 'cancelled', failure_reason = ?2, updated_at = ?3
        WHERE  id = ?1 AND status IN ('pending', 'approved')
        "#,
    )
    .bind(id)
    .bind(reason.unwrap_or("Cancelled by user"))
    .bind(db::now())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        let current = get_withdrawal(pool, id).await?;
        return Err(illegal(current.status, WithdrawalStatus::Cancelled));
    }
    get_withdrawal(pool, id).await
}

fn illegal(from: WithdrawalStatus, to: WithdrawalStatus) -> EngineError {
    EngineError::InvalidStateTransition {
        entity: "withdrawal",
        from: from.as_str(),
        to: to.as_str(),
    }
}

pub async fn get_withdrawal(pool: &SqlitePool, id: i64) -> Result<WithdrawalRequest> {
    sqlx::query_as::<_, WithdrawalRequest>("SELECT * FROM withdrawals WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("withdrawal {id}")))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalFilter {
    pub status: Option<String>,
    pub channel: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

pub async fn list_withdrawals(
    pool: &SqlitePool,
    filter: &WithdrawalFilter,
) -> Result<Vec<WithdrawalRequest>> {
    let rows = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        SELECT *
        FROM   withdrawals
        WHERE  (?1 IS NULL OR status = ?1)
          AND  (?2 IS NULL OR channel = ?2)
        ORDER  BY created_at DESC, id DESC
        LIMIT  ?3 OFFSET ?4
        "#,
    )
    .bind(&filter.status)
    .bind(&filter.channel)
    .bind(filter.limit.unwrap_or(20))
    .bind(filter.skip.unwrap_or(0))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn investor_withdrawals(
    pool: &SqlitePool,
    investor: &str,
) -> Result<Vec<WithdrawalRequest>> {
    let rows = sqlx::query_as::<_, WithdrawalRequest>(
        "SELECT * FROM withdrawals WHERE investor = ?1 ORDER BY created_at DESC, id DESC",
    )
    .bind(investor)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Stats
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusStat {
    pub status: String,
    pub count: i64,
    pub total_amount: f64,
    pub total_fees: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChannelStat {
    pub channel: String,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalStats {
    pub by_status: Vec<StatusStat>,
    pub by_channel: Vec<ChannelStat>,
}

pub async fn stats(pool: &SqlitePool) -> Result<WithdrawalStats> {
    let by_status = sqlx::query_as::<_, StatusStat>(
        r#"
        SELECT status,
               COUNT(*)                 AS count,
               COALESCE(SUM(amount), 0.0) AS total_amount,
               COALESCE(SUM(fee), 0.0)    AS total_fees
        FROM   withdrawals
        GROUP  BY status
        "#,
    )
    .fetch_all(pool)
    .await?;

    let by_channel = sqlx::query_as::<_, ChannelStat>(
        r#"
        SELECT channel,
               COUNT(*)                 AS count,
               COALESCE(SUM(amount), 0.0) AS total_amount
        FROM   withdrawals
        GROUP  BY channel
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(WithdrawalStats {
        by_status,
        by_channel,
    })
}
