//! Database layer — pool setup, migrations, and the offering catalog.
//!
//! Aggregate mutations elsewhere in the engine go through single guarded
//! `UPDATE` statements so concurrent writers cannot interleave a
//! read-modify-write; this module only holds the plain catalog queries.

use serde::Deserialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::{EngineError, Result};
use crate::models::{Offering, OfferingCategory, OfferingKind, RiskLevel};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Unix timestamp used for every `created_at`/`updated_at` stamp.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// Offering catalog
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewOffering {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: OfferingKind,
    pub category: OfferingCategory,
    pub risk: RiskLevel,
    #[serde(default)]
    pub expected_yield: f64,
    pub minimum_investment: f64,
    pub target_amount: f64,
    pub sector: Option<String>,
    pub location: Option<String>,
    pub escrow_address: Option<String>,
}

pub async fn create_offering(pool: &SqlitePool, new: &NewOffering) -> Result<Offering> {
    let ts = now();
    let id = sqlx::query(
        r#"
        INSERT INTO offerings
            (name, description, kind, category, risk, expected_yield,
             minimum_investment, target_amount, sector, location,
             escrow_address, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        "#,
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.kind)
    .bind(new.category)
    .bind(new.risk)
    .bind(new.expected_yield)
    .bind(new.minimum_investment)
    .bind(new.target_amount)
    .bind(&new.sector)
    .bind(&new.location)
    .bind(&new.escrow_address)
    .bind(ts)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_offering(pool, id).await
}

pub async fn get_offering(pool: &SqlitePool, id: i64) -> Result<Offering> {
    sqlx::query_as::<_, Offering>("SELECT * FROM offerings WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("offering {id}")))
}

/// Catalog filter. When no status is given the listing defaults to `active`
/// offerings only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferingFilter {
    pub status: Option<String>,
    pub kind: Option<String>,
    pub category: Option<String>,
    pub risk: Option<String>,
}

pub async fn list_offerings(pool: &SqlitePool, filter: &OfferingFilter) -> Result<Vec<Offering>> {
    let status = filter.status.clone().unwrap_or_else(|| "active".to_string());
    let rows = sqlx::query_as::<_, Offering>(
        r#"
        SELECT *
        FROM   offerings
        WHERE  status = ?1
          AND  (?2 IS NULL OR kind = ?2)
          AND  (?3 IS NULL OR category = ?3)
          AND  (?4 IS NULL OR risk = ?4)
        ORDER  BY created_at DESC
        "#,
    )
    .bind(status)
    .bind(&filter.kind)
    .bind(&filter.category)
    .bind(&filter.risk)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
