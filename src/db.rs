use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::config::AppConfig;

/// Shared connection handle used across the service layer.
pub type DbPool = DatabaseConnection;

/// Opens a connection pool tuned from application config.
pub async fn establish_connection(config: &AppConfig) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .sqlx_logging(!config.is_production());

    info!(
        max_connections = config.db_max_connections,
        "Connecting to database"
    );
    gauge!(
        "fba_ledger_db.max_connections",
        config.db_max_connections as f64
    );

    Database::connect(options).await
}

/// Applies pending migrations from the embedded migrator.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbErr> {
    info!("Running database migrations");
    crate::migrator::Migrator::up(pool, None).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Round-trips a trivial query so health checks can report connectivity.
pub async fn check_connection(pool: &DbPool) -> bool {
    let start = Instant::now();
    match pool.ping().await {
        Ok(_) => {
            gauge!(
                "fba_ledger_db.connection_latency_ms",
                start.elapsed().as_millis() as f64
            );
            true
        }
        Err(err) => {
            error!("Database connectivity check failed: {}", err);
            counter!("fba_ledger_db.connection_failures", 1);
            false
        }
    }
}
