//! Axum REST API handlers.
//!
//! Errors bubble up as [`EngineError`], which renders as a JSON
//! `{ "error": ... }` body with the status code matching the error class
//! (400 validation, 404 missing, 409 consistency, 502 gateway).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::{self, NewOffering, OfferingFilter};
use crate::errors::{EngineError, Result};
use crate::gateway::LedgerGateway;
use crate::models::{Offering, Position, TransferRecord, VettingStage, WithdrawalRequest};
use crate::positions;
use crate::reconciler;
use crate::settlement::{self, TransferClaim};
use crate::vetting;
use crate::withdrawals::{self, WithdrawalFilter, WithdrawalInput};

pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    pub gateway: Arc<dyn LedgerGateway>,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TransferClaimInput {
    pub investor: String,
    pub offering_id: i64,
    pub amount: f64,
    pub hash: String,
}

#[derive(Serialize)]
pub struct TransferClaimResponse {
    pub transfer: TransferRecord,
    pub position: Option<Position>,
}

#[derive(Serialize)]
pub struct OfferingsResponse {
    pub count: usize,
    pub offerings: Vec<Offering>,
}

#[derive(Serialize)]
pub struct OfferingResponse {
    pub offering: Offering,
    pub vetting_stages: Vec<VettingStage>,
}

#[derive(Serialize)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    pub total_value: f64,
    pub total_returns: f64,
    pub roi: f64,
    pub holdings_count: usize,
}

#[derive(Serialize)]
pub struct PortfolioResponse {
    pub summary: PortfolioSummary,
    pub holdings: Vec<Position>,
}

#[derive(Serialize)]
pub struct TransfersResponse {
    pub count: usize,
    pub transfers: Vec<TransferRecord>,
}

#[derive(Serialize)]
pub struct WithdrawalsResponse {
    pub count: usize,
    pub withdrawals: Vec<WithdrawalRequest>,
}

#[derive(Deserialize)]
pub struct ApproveBody {
    pub approver: String,
    pub reference: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelBody {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct VettingStageBody {
    pub stage_id: String,
    pub label: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct AdminStats {
    pub offerings: i64,
    pub transfers: i64,
    pub withdrawals: i64,
    pub investors: i64,
    pub confirmed_volume: f64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /transfers`
///
/// Submit a claimed external transfer for settlement.
pub async fn create_transfer_claim(
    State(state): State<Arc<ApiState>>,
    Json(input): Json<TransferClaimInput>,
) -> Result<Json<TransferClaimResponse>> {
    let claim = TransferClaim {
        investor: input.investor,
        offering_id: input.offering_id,
        amount: input.amount,
        external_hash: input.hash,
    };
    let transfer = settlement::record_transfer(&state.pool, state.gateway.as_ref(), &claim).await?;
    let position = positions::get_position(&state.pool, &transfer.investor, transfer.offering_id)
        .await?;
    Ok(Json(TransferClaimResponse { transfer, position }))
}

/// `GET /offerings`
pub async fn list_offerings(
    State(state): State<Arc<ApiState>>,
    Query(filter): Query<OfferingFilter>,
) -> Result<Json<OfferingsResponse>> {
    let offerings = db::list_offerings(&state.pool, &filter).await?;
    Ok(Json(OfferingsResponse {
        count: offerings.len(),
        offerings,
    }))
}

/// `GET /offerings/:id`
pub async fn get_offering(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<OfferingResponse>> {
    let offering = db::get_offering(&state.pool, id).await?;
    let vetting_stages = vetting::list_stages(&state.pool, id).await?;
    Ok(Json(OfferingResponse {
        offering,
        vetting_stages,
    }))
}

/// `POST /offerings` (admin)
pub async fn create_offering(
    State(state): State<Arc<ApiState>>,
    Json(new): Json<NewOffering>,
) -> Result<Json<Offering>> {
    if new.target_amount <= 0.0 || new.minimum_investment <= 0.0 {
        return Err(EngineError::InvalidInput(
            "target_amount and minimum_investment must be positive".to_string(),
        ));
    }
    Ok(Json(db::create_offering(&state.pool, &new).await?))
}

/// `PUT /offerings/:id/approve` (admin)
pub async fn approve_offering(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<Offering>> {
    Ok(Json(vetting::approve_offering(&state.pool, id).await?))
}

/// `PUT /offerings/:id/vetting-stage` (admin)
pub async fn update_vetting_stage(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(body): Json<VettingStageBody>,
) -> Result<Json<VettingStage>> {
    let status = crate::models::VettingStatus::parse(&body.status).ok_or_else(|| {
        EngineError::InvalidInput(format!("unknown vetting status: {}", body.status))
    })?;
    let stage = vetting::advance_stage(&state.pool, id, &body.stage_id, &body.label, status).await?;
    Ok(Json(stage))
}

/// `POST /offerings/:id/reconcile` (admin, on-demand)
pub async fn reconcile_offering(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let repaired =
        reconciler::reconcile_offering(&state.pool, state.gateway.as_ref(), id).await?;
    Ok(Json(serde_json::json!({ "offering_id": id, "repaired": repaired })))
}

/// `GET /investors/:investor/portfolio`
pub async fn get_portfolio(
    State(state): State<Arc<ApiState>>,
    Path(investor): Path<String>,
) -> Result<Json<PortfolioResponse>> {
    let holdings = positions::list_positions(&state.pool, &investor).await?;

    let total_investment: f64 = holdings.iter().map(|h| h.principal).sum();
    let total_value: f64 = holdings.iter().map(|h| h.current_value).sum();
    let total_returns: f64 = holdings.iter().map(|h| h.accrued_returns).sum();
    let roi = if total_investment > 0.0 {
        (total_value - total_investment) / total_investment * 100.0
    } else {
        0.0
    };

    Ok(Json(PortfolioResponse {
        summary: PortfolioSummary {
            total_investment,
            total_value,
            total_returns,
            roi,
            holdings_count: holdings.len(),
        },
        holdings,
    }))
}

/// `GET /investors/:investor/transfers`
pub async fn get_transfer_history(
    State(state): State<Arc<ApiState>>,
    Path(investor): Path<String>,
) -> Result<Json<TransfersResponse>> {
    let transfers = settlement::investor_history(&state.pool, &investor).await?;
    Ok(Json(TransfersResponse {
        count: transfers.len(),
        transfers,
    }))
}

/// `GET /investors/:investor/withdrawals`
pub async fn get_investor_withdrawals(
    State(state): State<Arc<ApiState>>,
    Path(investor): Path<String>,
) -> Result<Json<WithdrawalsResponse>> {
    let withdrawals = withdrawals::investor_withdrawals(&state.pool, &investor).await?;
    Ok(Json(WithdrawalsResponse {
        count: withdrawals.len(),
        withdrawals,
    }))
}

/// `POST /withdrawals`
pub async fn create_withdrawal(
    State(state): State<Arc<ApiState>>,
    Json(input): Json<WithdrawalInput>,
) -> Result<Json<WithdrawalRequest>> {
    let request =
        withdrawals::request_withdrawal(&state.pool, state.config.minimum_withdrawal, &input)
            .await?;
    Ok(Json(request))
}

/// `GET /withdrawals` (admin)
pub async fn list_withdrawals(
    State(state): State<Arc<ApiState>>,
    Query(filter): Query<WithdrawalFilter>,
) -> Result<Json<WithdrawalsResponse>> {
    let withdrawals = withdrawals::list_withdrawals(&state.pool, &filter).await?;
    Ok(Json(WithdrawalsResponse {
        count: withdrawals.len(),
        withdrawals,
    }))
}

/// `PUT /withdrawals/:id/approve` (admin)
pub async fn approve_withdrawal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<WithdrawalRequest>> {
    let request =
        withdrawals::approve(&state.pool, id, &body.approver, body.reference.as_deref()).await?;
    Ok(Json(request))
}

/// `PUT /withdrawals/:id/process` (admin)
pub async fn process_withdrawal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<WithdrawalRequest>> {
    Ok(Json(withdrawals::process(&state.pool, id).await?))
}

/// `PUT /withdrawals/:id/cancel`
pub async fn cancel_withdrawal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    body: Option<Json<CancelBody>>,
) -> Result<Json<WithdrawalRequest>> {
    let reason = body.as_ref().and_then(|b| b.reason.as_deref());
    Ok(Json(withdrawals::cancel(&state.pool, id, reason).await?))
}

/// `GET /withdrawals/stats` (admin)
pub async fn withdrawal_stats(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<withdrawals::WithdrawalStats>> {
    Ok(Json(withdrawals::stats(&state.pool).await?))
}

/// `GET /admin/stats`
pub async fn admin_stats(State(state): State<Arc<ApiState>>) -> Result<Json<AdminStats>> {
    let (offerings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM offerings")
        .fetch_one(&state.pool)
        .await?;
    let (transfers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transfers")
        .fetch_one(&state.pool)
        .await?;
    let (withdrawals,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM withdrawals")
        .fetch_one(&state.pool)
        .await?;
    let (investors,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT investor) FROM positions")
        .fetch_one(&state.pool)
        .await?;
    let (confirmed_volume,): (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0.0) FROM transfers WHERE status = 'confirmed'",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(AdminStats {
        offerings,
        transfers,
        withdrawals,
        investors,
        confirmed_volume,
    }))
}
