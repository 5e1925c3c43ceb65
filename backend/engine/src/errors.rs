//! Application-wide error types.
//!
//! Domain variants follow a three-way split: validation errors reject a
//! request before any state is touched, consistency errors leave the entity
//! in its prior valid state, and gateway errors are retryable (the record is
//! parked as `pending` rather than the request failing).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("ledger gateway error: {0}")]
    Gateway(#[from] reqwest::Error),

    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} not found")]
    NotFound(String),

    // ── validation ──
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("amount {amount} is below the minimum contribution of {minimum}")]
    BelowMinimumContribution { amount: f64, minimum: f64 },

    #[error("amount {amount} is below the minimum withdrawal of {minimum}")]
    BelowMinimumWithdrawal { amount: f64, minimum: f64 },

    #[error("unsupported payout channel: {0}")]
    UnsupportedChannel(String),

    #[error("missing payout details for channel {0}")]
    MissingChannelDetails(String),

    // ── consistency ──
    #[error("claimed amount {claimed} does not match settled amount {settled}")]
    AmountMismatch { claimed: f64, settled: f64 },

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: f64, requested: f64 },

    #[error("illegal {entity} transition from {from} to {to}")]
    InvalidStateTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    #[error("offering {0} is not open for contributions")]
    OfferingNotOpen(i64),

    // ── data integrity ──
    #[error("external hash {0} is already bound to a different claim")]
    HashAlreadyBound(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidInput(_)
            | EngineError::BelowMinimumContribution { .. }
            | EngineError::BelowMinimumWithdrawal { .. }
            | EngineError::UnsupportedChannel(_)
            | EngineError::MissingChannelDetails(_) => StatusCode::BAD_REQUEST,
            EngineError::AmountMismatch { .. }
            | EngineError::InsufficientBalance { .. }
            | EngineError::InvalidStateTransition { .. }
            | EngineError::OfferingNotOpen(_)
            | EngineError::HashAlreadyBound(_) => StatusCode::CONFLICT,
            EngineError::Gateway(_) | EngineError::Rpc { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
