use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors from DatabaseManager and the repositories built on it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DatabaseError {
    /// Map a unique-constraint violation to `Conflict`, anything else passes through
    pub fn on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::Conflict(message()),
            _ => DatabaseError::Sqlx(err),
        }
    }
}

/// Owns the Postgres pool. Connections are opened on first use so the
/// server starts even when the database is unreachable.
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: Option<PgPool>,
}

impl DatabaseManager {
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let Some(raw_url) = config.url.as_deref() else {
            info!("DATABASE_URL not set; relational endpoints will report unavailable");
            return Ok(Self { pool: None });
        };

        let url = url::Url::parse(raw_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy(url.as_str())?;

        info!(
            "Database pool configured for {}{}",
            url.host_str().unwrap_or("localhost"),
            url.path()
        );
        Ok(Self { pool: Some(pool) })
    }

    /// Manager with no backing database
    pub fn disconnected() -> Self {
        Self { pool: None }
    }

    pub fn pool(&self) -> Result<&PgPool, DatabaseError> {
        self.pool.as_ref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(self.pool()?).await?;
        Ok(())
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        MIGRATOR.run(self.pool()?).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
