//! Application configuration loaded from environment variables.

use crate::errors::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the external settlement layer
    pub rpc_url: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) the reconciler re-checks cached aggregates
    pub reconcile_interval_secs: u64,
    /// Smallest withdrawal amount the engine accepts
    pub minimum_withdrawal: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL")
                .unwrap_or_else(|_| "http://localhost:8899".to_string()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./settlement_engine.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| EngineError::Config("Invalid API_PORT".to_string()))?,
            reconcile_interval_secs: env_var("RECONCILE_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| EngineError::Config("Invalid RECONCILE_INTERVAL_SECS".to_string()))?,
            minimum_withdrawal: env_var("MINIMUM_WITHDRAWAL")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| EngineError::Config("Invalid MINIMUM_WITHDRAWAL".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| EngineError::Config(format!("Missing env var: {key}")))
}
