//! Entity types and their closed status enumerations.
//!
//! Every lifecycle field is a tagged enum stored as TEXT, and every mutation
//! path checks the explicit transition table on the enum before writing, so
//! legality is never inferred from loose strings at the call site.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────
// Status enums + transition tables
// ─────────────────────────────────────────────────────────

/// Funding lifecycle of an offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OfferingStatus {
    Active,
    Funded,
    Closed,
}

impl OfferingStatus {
    /// Forward-only: an offering never regresses from `funded`/`closed`
    /// back to `active`.
    pub fn can_transition(self, to: OfferingStatus) -> bool {
        matches!(
            (self, to),
            (OfferingStatus::Active, OfferingStatus::Funded)
                | (OfferingStatus::Active, OfferingStatus::Closed)
                | (OfferingStatus::Funded, OfferingStatus::Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OfferingStatus::Active => "active",
            OfferingStatus::Funded => "funded",
            OfferingStatus::Closed => "closed",
        }
    }
}

/// Settlement state of an off-ledger transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransferStatus {
    /// A pending claim resolves exactly once; confirmed and failed are
    /// terminal.
    pub fn can_transition(self, to: TransferStatus) -> bool {
        matches!(
            (self, to),
            (TransferStatus::Pending, TransferStatus::Confirmed)
                | (TransferStatus::Pending, TransferStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Confirmed => "confirmed",
            TransferStatus::Failed => "failed",
        }
    }
}

/// Lifecycle of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processed,
    Failed,
    Cancelled,
}

impl WithdrawalStatus {
    /// `pending → approved → processed`; cancellation only from
    /// `pending`/`approved`; `failed` only from `approved` (a deduction that
    /// could not be covered). No transition leaves a terminal state.
    pub fn can_transition(self, to: WithdrawalStatus) -> bool {
        matches!(
            (self, to),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Cancelled)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Processed)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Failed)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Processed | WithdrawalStatus::Failed | WithdrawalStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Processed => "processed",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }
}

/// Payout channels supported by the withdrawal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PayoutChannel {
    BankTransfer,
    OrangeMoney,
    AfromoMoney,
}

impl PayoutChannel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bank_transfer" => Some(Self::BankTransfer),
            "orange_money" => Some(Self::OrangeMoney),
            "afromo_money" => Some(Self::AfromoMoney),
            _ => None,
        }
    }

    /// 2% for bank transfers, 1% for the mobile-money channels.
    pub fn fee_rate(self) -> f64 {
        match self {
            PayoutChannel::BankTransfer => 0.02,
            PayoutChannel::OrangeMoney | PayoutChannel::AfromoMoney => 0.01,
        }
    }

    pub fn is_mobile_money(self) -> bool {
        matches!(self, PayoutChannel::OrangeMoney | PayoutChannel::AfromoMoney)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PayoutChannel::BankTransfer => "bank_transfer",
            PayoutChannel::OrangeMoney => "orange_money",
            PayoutChannel::AfromoMoney => "afromo_money",
        }
    }
}

/// Status of one administrative vetting checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum VettingStatus {
    Pending,
    Current,
    Completed,
}

impl VettingStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "current" => Some(Self::Current),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OfferingKind {
    Startup,
    Bond,
    Fund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OfferingCategory {
    Growth,
    Income,
    Impact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

// ─────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────

/// An investable opportunity. `total_raised` is derived state: it must equal
/// the sum of confirmed transfer amounts against this offering at all times.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offering {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub kind: OfferingKind,
    pub category: OfferingCategory,
    pub risk: RiskLevel,
    pub expected_yield: f64,
    pub minimum_investment: f64,
    pub target_amount: f64,
    pub total_raised: f64,
    pub status: OfferingStatus,
    pub verified: bool,
    pub sector: Option<String>,
    pub location: Option<String>,
    /// Settlement-layer account that receives contributions, when known.
    /// Used by reconciliation only.
    pub escrow_address: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One investor's cumulative stake in one offering. Never deleted; a
/// fully-withdrawn position is retained at zero for audit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Position {
    pub investor: String,
    pub offering_id: i64,
    pub principal: f64,
    pub current_value: f64,
    pub accrued_returns: f64,
    pub updated_at: i64,
}

/// Off-ledger mirror of one external stablecoin transfer, keyed by its
/// globally unique external hash.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransferRecord {
    pub id: i64,
    pub investor: String,
    pub offering_id: i64,
    pub amount: f64,
    pub external_hash: String,
    pub status: TransferStatus,
    pub fee: f64,
    pub recorded_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WithdrawalRequest {
    pub id: i64,
    pub investor: String,
    pub amount: f64,
    pub channel: PayoutChannel,
    pub fee: f64,
    pub net_amount: f64,
    pub status: WithdrawalStatus,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub phone_number: Option<String>,
    pub provider_name: Option<String>,
    pub account_name: Option<String>,
    pub reference: Option<String>,
    pub approved_by: Option<String>,
    pub processed_at: Option<i64>,
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VettingStage {
    pub offering_id: i64,
    pub stage_id: String,
    pub label: String,
    pub status: VettingStatus,
    pub completed_at: Option<i64>,
}

// ─────────────────────────────────────────────────────────
// Payout detail payloads
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub swift_code: Option<String>,
    pub routing_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileMoneyDetails {
    pub phone_number: String,
    pub provider_name: String,
    pub account_name: String,
}
