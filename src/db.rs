use crate::config::AppConfig;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    TransactionError, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    /// Emit every statement through the sqlx logger
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
            sqlx_logging: false,
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
            sqlx_logging: cfg.log_level.eq_ignore_ascii_case("trace"),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, DbErr> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(config.sqlx_logging);

    gauge!("inventory_db.max_connections", config.max_connections as f64);

    let pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        e
    })?;

    info!("Database connection pool established");
    Ok(pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbErr> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None).await;

    match &result {
        Ok(_) => info!(elapsed = ?start.elapsed(), "Database migrations completed"),
        Err(e) => error!(error = %e, "Database migrations failed"),
    }
    result
}

/// Round-trips a trivial statement to verify connectivity
pub async fn check_connection(pool: &DbPool) -> Result<(), DbErr> {
    pool.ping().await
}

/// Closes the pool, waiting for in-flight connections
pub async fn close_pool(pool: DbPool) -> Result<(), DbErr> {
    info!("Closing database connection pool");
    pool.close().await
}

/// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
pub async fn transaction<C, F, T>(db: &C, operation: &'static str, f: F) -> Result<T, ServiceError>
where
    C: TransactionTrait + ConnectionTrait,
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let start = Instant::now();
    let result = db.transaction::<_, T, ServiceError>(f).await;
    let elapsed = start.elapsed();
    histogram!("inventory_db.transaction.duration", elapsed, "operation" => operation);

    match result {
        Ok(value) => {
            counter!("inventory_db.transaction.committed", 1, "operation" => operation);
            debug!(operation, ?elapsed, "Transaction committed");
            Ok(value)
        }
        Err(TransactionError::Connection(e)) => {
            counter!("inventory_db.transaction.rolled_back", 1, "operation" => operation);
            warn!(operation, error = %e, "Transaction failed on connection");
            Err(e.into())
        }
        Err(TransactionError::Transaction(e)) => {
            counter!("inventory_db.transaction.rolled_back", 1, "operation" => operation);
            debug!(operation, error = %e, "Transaction rolled back");
            Err(e)
        }
    }
}
