//! Settlement engine — entry point.
//!
//! Starts the background reconciler that re-aligns cached aggregates with
//! ledger-confirmed transfers, and serves the Axum REST API used by the
//! investor frontend and administrative tooling.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use settlement_engine::api::{self, ApiState};
use settlement_engine::config::Config;
use settlement_engine::db;
use settlement_engine::gateway::{LedgerGateway, RpcGateway};
use settlement_engine::reconciler::{self, ReconcilerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url).await?;

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let gateway: Arc<dyn LedgerGateway> =
        Arc::new(RpcGateway::new(client, config.rpc_url.clone()));

    // ─── Background reconciler ───────────────────────────
    let reconciler_state = Arc::new(ReconcilerState {
        pool: pool.clone(),
        config: config.clone(),
        gateway: gateway.clone(),
    });
    tokio::spawn(reconciler::run(reconciler_state));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(ApiState {
        pool,
        config: config.clone(),
        gateway,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/transfers", post(api::create_transfer_claim))
        .route("/offerings", get(api::list_offerings).post(api::create_offering))
        .route("/offerings/:id", get(api::get_offering))
        .route("/offerings/:id/approve", put(api::approve_offering))
        .route("/offerings/:id/vetting-stage", put(api::update_vetting_stage))
        .route("/offerings/:id/reconcile", post(api::reconcile_offering))
        .route("/investors/:investor/portfolio", get(api::get_portfolio))
        .route("/investors/:investor/transfers", get(api::get_transfer_history))
        .route(
            "/investors/:investor/withdrawals",
            get(api::get_investor_withdrawals),
        )
        .route(
            "/withdrawals",
            get(api::list_withdrawals).post(api::create_withdrawal),
        )
        .route("/withdrawals/stats", get(api::withdrawal_stats))
        .route("/withdrawals/:id/approve", put(api::approve_withdrawal))
        .route("/withdrawals/:id/process", put(api::process_withdrawal))
        .route("/withdrawals/:id/cancel", put(api::cancel_withdrawal))
        .route("/admin/stats", get(api::admin_stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
