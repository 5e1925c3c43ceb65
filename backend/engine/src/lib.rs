//! Investment ledger & settlement engine.
//!
//! Records ledger-verified investor transfers against offerings, maintains
//! the derived portfolio positions, drives the withdrawal payout state
//! machine, and reconciles the off-ledger cache against the external
//! settlement layer.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod positions;
pub mod reconciler;
pub mod settlement;
pub mod vetting;
pub mod withdrawals;
