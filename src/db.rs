use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::migrate::MigrateDatabase;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    Sqlite,
};
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Failed to create database: {0}")]
    DatabaseCreationFailed(String),
}

pub type DbResult<T> = Result<T, DatabaseError>;

/// Represents an established database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Database health status
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DBHealthStatus {
    Healthy,
    Unhealthy,
}

/// Complete database health check result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseHealth {
    pub status: DBHealthStatus,
    pub response_time_ms: u64,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite_version: Option<String>,
}

impl Database {
    /// Create a new database connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("Initializing database connection");
        debug!(
            "Database configuration: max_conn={}, min_conn={}, timeout={}s",
            config.max_connections, config.min_connections, config.connect_timeout_seconds
        );

        Self::ensure_database_exists(config).await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                DatabaseError::ConnectionError(e)
            })?;

        info!("Successfully connected to database");

        if config.use_migrations {
            Self::run_migrations(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Private in-memory database with the schema applied.
    ///
    /// Pinned to a single connection that never expires, since every new
    /// in-memory connection would start from an empty database.
    #[cfg(test)]
    pub async fn in_memory() -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> DatabaseHealth {
        let start = Instant::now();

        let result = sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
            .fetch_one(self.get_pool())
            .await;

        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(version) => DatabaseHealth {
                status: DBHealthStatus::Healthy,
                response_time_ms,
                message: None,
                sqlite_version: Some(version),
            },
            Err(e) => {
                error!("Database health check failed: {}", e);
                DatabaseHealth {
                    status: DBHealthStatus::Unhealthy,
                    response_time_ms,
                    message: Some(format!("Database query failed: {}", e)),
                    sqlite_version: None,
                }
            }
        }
    }

    /// Ensure the database file exists, create it if allowed
    async fn ensure_database_exists(config: &DatabaseConfig) -> DbResult<()> {
        let url = &config.url;

        let db_exists = Sqlite::database_exists(url)
            .await
            .map_err(DatabaseError::ConnectionError)?;

        if db_exists {
            debug!("Database '{}' exists", url);
            return Ok(());
        }

        if !config.create_database_if_missing {
            return Err(DatabaseError::DatabaseNotFound(format!(
                "Database '{}' does not exist",
                url
            )));
        }

        info!("Database '{}' does not exist, creating it", url);
        Sqlite::create_database(url).await.map_err(|err| {
            DatabaseError::DatabaseCreationFailed(format!(
                "Failed to create database '{}': {}",
                url, err
            ))
        })?;
        info!("Successfully created database '{}'", url);

        Ok(())
    }

    /// Run database migrations
    async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
        info!("Running database migrations");

        match sqlx::migrate!("./migrations").run(pool).await {
            Ok(_) => {
                info!("Database migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                warn!("Database migration error: {}", e);
                Err(DatabaseError::MigrationError(e.to_string()))
            }
        }
    }

    /// Gracefully close the database connection pool
    pub async fn shutdown(&self) {
        info!("Shutting down database connection pool...");

        let used_connections = self.pool.size();
        let idle_connections = self.pool.num_idle();

        self.pool.close().await;

        info!(
            "Database connection pool closed. Stats: {} active, {} idle connections released",
            used_connections, idle_connections
        );
    }
}
