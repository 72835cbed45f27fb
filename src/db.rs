use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::SupportConfig;

/// Opens the pool and applies pending migrations.
pub async fn connect(config: &SupportConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the support database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run support migrations")?;

    tracing::info!(max_connections = config.max_connections, "Support database ready");
    Ok(pool)
}
