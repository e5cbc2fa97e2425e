pub mod attendance;
pub mod config;
pub mod employee;
pub mod revision;
pub mod selfie;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use crate::config::Config;

/// Opens the process-wide pool. Created once in `main`, shared through
/// `web::Data`, closed on shutdown.
pub async fn init_db(config: &Config) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}
