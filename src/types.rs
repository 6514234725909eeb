use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::db::{Database, DatabaseHealth};
use crate::errors::AppError;
use crate::rate_limit::RateLimitStore;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db_health: DatabaseHealth,
    pub rate_limited_clients: usize,
    pub uptime_seconds: u64,
}

// Shared application state
pub struct AppState {
    pub start_time: Instant,
    pub db: Database,
    pub rate_limits: Arc<RateLimitStore>,
    pub version: String,
}
