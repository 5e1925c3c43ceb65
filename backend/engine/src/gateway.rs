//! Ledger Gateway — query interface to the external settlement layer.
//!
//! The settlement layer is consumed as an opaque finality oracle over
//! JSON-RPC: "has transfer H finalized, and for what amount/asset?".
//! Nothing here mutates ledger state.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or
//!   rate-limit response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Retries are bounded by [`MAX_ATTEMPTS`]: the settlement recorder sits
//!   on the request hot path and parks unresolved claims as `pending` for
//!   the reconciler to pick up, so the gateway must fail fast rather than
//!   spin forever.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{EngineError, Result};

const MAX_ATTEMPTS: u32 = 3;
const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Finality report for one external transfer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Finality {
    pub finalized: bool,
    pub amount: f64,
    pub asset: String,
}

/// Raw balance info for a settlement-layer account. Consumed only by the
/// reconciler; never used to derive local aggregates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountState {
    pub address: String,
    pub balance: f64,
}

// ─────────────────────────────────────────────────────────
// Port
// ─────────────────────────────────────────────────────────

/// Read-only port onto the external settlement layer. The settlement
/// recorder and the reconciler talk to the ledger exclusively through this
/// trait, so tests can substitute an in-memory fake.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Look up a transfer by its external hash.
    ///
    /// Returns `Ok(None)` when the hash is unknown to the ledger or not yet
    /// final; `Err` only on gateway unavailability, which callers treat as
    /// retryable.
    async fn query_finality(&self, hash: &str) -> Result<Option<Finality>>;

    /// Raw balance of a settlement-layer account.
    async fn query_account_state(&self, address: &str) -> Result<AccountState>;
}

/// JSON-RPC backed implementation of [`LedgerGateway`].
pub struct RpcGateway {
    client: Client,
    rpc_url: String,
}

impl RpcGateway {
    pub fn new(client: Client, rpc_url: impl Into<String>) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
        }
    }

    async fn post_rpc(&self, method: &str, params: Value) -> Result<Option<Value>> {
        let mut backoff = INITIAL_BACKOFF_SECS;

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self
                .client
                .post(&self.rpc_url)
                .json(&json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": method,
                    "params": params,
                }))
                .send()
                .await;

            let resp = match response {
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("RPC request failed (retry in {backoff}s): {e}");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }
                Err(e) => return Err(e.into()),
                Ok(resp) => resp,
            };

            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt < MAX_ATTEMPTS {
                    warn!("Rate-limited by RPC (retry in {backoff}s)");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }
                return Err(EngineError::Rpc {
                    code: 429,
                    message: "rate limited".to_string(),
                });
            }

            let body: RpcResponse = resp.json().await?;

            if let Some(err) = body.error {
                // -32600 / -32601 are hard failures; everything else gets
                // one more round of back-off before giving up.
                if err.code == -32600 || err.code == -32601 || attempt == MAX_ATTEMPTS {
                    return Err(EngineError::Rpc {
                        code: err.code,
                        message: err.message,
                    });
                }
                warn!(
                    "RPC soft error (retry in {backoff}s): {} {}",
                    err.code, err.message
                );
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            debug!("RPC {method} ok");
            return Ok(body.result.filter(|v| !v.is_null()));
        }

        unreachable!("RPC retry loop exits via return")
    }
}

#[async_trait]
impl LedgerGateway for RpcGateway {
    async fn query_finality(&self, hash: &str) -> Result<Option<Finality>> {
        let result = self.post_rpc("getTransfer", json!([hash])).await?;
        let Some(value) = result else {
            return Ok(None);
        };
        let finality: Finality = serde_json::from_value(value)?;
        if finality.finalized {
            Ok(Some(finality))
        } else {
            Ok(None)
        }
    }

    async fn query_account_state(&self, address: &str) -> Result<AccountState> {
        let result = self.post_rpc("getAccount", json!([address])).await?;
        let value = result.ok_or_else(|| EngineError::NotFound(format!("account {address}")))?;
        Ok(serde_json::from_value(value)?)
    }
}
