use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::AppConfig;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE,
    username        TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ
)
"#;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let db = connect_and_prepare(&config).await?;
        Ok(Self { db, config })
    }
}

/// Connect to the database and create the schema, retrying a bounded number
/// of times before giving up. This is the only retry loop in the process;
/// request handling never retries.
pub async fn connect_and_prepare(config: &AppConfig) -> anyhow::Result<PgPool> {
    let url = config.connection_url();
    let retries = config.database.connect_retries.max(1);
    let delay = Duration::from_secs(config.database.retry_delay_secs);

    let mut last_err: Option<anyhow::Error> = None;
    for attempt in 1..=retries {
        match try_prepare(config, &url).await {
            Ok(pool) => {
                info!("database tables created successfully");
                return Ok(pool);
            }
            Err(e) => {
                if attempt < retries {
                    warn!(error = %e, attempt, "database connection failed, retrying in {}s", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| anyhow::anyhow!("database bootstrap failed"))
        .context(format!("failed to connect to database after {retries} attempts")))
}

async fn try_prepare(config: &AppConfig, url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("connect to database")?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Create the users table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(CREATE_USERS_TABLE)
        .execute(pool)
        .await
        .context("create users table")?;
    Ok(())
}
