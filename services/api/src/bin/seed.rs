//! services/api/src/bin/seed.rs
//!
//! Loads a course catalog JSON file into the database:
//! `seed path/to/catalog.json`

use api_lib::{
    adapters::DbAdapter,
    config::Config,
    error::ApiError,
    seed::{insert_catalog, CatalogFile},
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| ApiError::Internal("usage: seed <catalog.json>".to_string()))?;
    let raw = tokio::fs::read_to_string(&path).await?;
    let catalog = CatalogFile::from_json(&raw)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    DbAdapter::new(pool.clone()).run_migrations().await?;

    let summary = insert_catalog(&pool, &catalog).await?;
    info!(
        "Seeded {} courses, {} modules, {} lessons, {} quiz questions from {}",
        summary.courses, summary.modules, summary.lessons, summary.quizzes, path
    );
    Ok(())
}
