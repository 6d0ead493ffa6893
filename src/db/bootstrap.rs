//! Startup helpers: wait for Postgres, seed the dataset on first run, report what is stored.

use crate::config::AppConfig;
use crate::db::connection::init_pool;
use crate::db::loader;
use crate::error::{Result, VidsqlError};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error, info, warn};

const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub public_tables: i64,
    /// `None` when the relation does not exist.
    pub videos: Option<i64>,
    pub video_snapshots: Option<i64>,
}

/// Connect, retrying once per second until `storage_wait_retries` attempts are used up.
pub async fn wait_for_storage(config: &AppConfig) -> Result<PgPool> {
    let attempts = config.storage_wait_retries.max(1);
    let target = config.database.display_target();

    for attempt in 1..=attempts {
        match init_pool(&config.database).await {
            Ok(pool) => {
                info!("PostgreSQL is ready at {}", target);
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!("Waiting for PostgreSQL at {} ({}/{}): {}", target, attempt, attempts, e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                error!("PostgreSQL at {} is unavailable after {} attempts", target, attempts);
                return Err(e.into());
            }
        }
    }

    Err(VidsqlError::Database(format!("PostgreSQL at {} is unavailable", target)))
}

/// Load the data file when auto-load is on and `videos` is missing or empty.
/// Failures are logged; startup continues either way.
pub async fn ensure_data(pool: &PgPool, config: &AppConfig) -> bool {
    if !config.auto_load_data {
        return false;
    }
    if !config.data_file.exists() {
        warn!("Data file {} not found, skipping load", config.data_file.display());
        return false;
    }

    let existing = match count_rows(pool, "videos").await {
        Ok(count) => count,
        Err(e) => {
            warn!("Could not inspect videos table: {}", e);
            None
        }
    };
    if matches!(existing, Some(n) if n > 0) {
        info!("Database already holds {} videos", existing.unwrap_or_default());
        return false;
    }

    info!("Loading data from {}", config.data_file.display());
    match loader::load_json(pool, &config.data_file).await {
        Ok(stats) => {
            info!("Loaded {} videos and {} snapshots", stats.videos, stats.snapshots);
            true
        }
        Err(e) => {
            error!("Data load failed: {}", e);
            false
        }
    }
}

pub async fn storage_stats(pool: &PgPool) -> Result<StorageStats> {
    let (public_tables,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public'",
    )
    .fetch_one(pool)
    .await?;

    Ok(StorageStats {
        public_tables,
        videos: count_rows(pool, "videos").await?,
        video_snapshots: count_rows(pool, "video_snapshots").await?,
    })
}

/// Row count of a known relation, or `None` if it has not been created yet.
async fn count_rows(pool: &PgPool, relation: &'static str) -> Result<Option<i64>> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_name = $1)",
    )
    .bind(relation)
    .fetch_one(pool)
    .await?;
    if !exists {
        return Ok(None);
    }

    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", relation))
        .fetch_one(pool)
        .await?;
    Ok(Some(count))
}
