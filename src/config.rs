use std::{env, net::IpAddr, str::FromStr, time::Duration};

use dotenvy::dotenv;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Requests allowed per client inside one window.
pub const DEFAULT_RATE_LIMIT: usize = 3;
/// Length of the sliding window.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);
/// How often stale clients are purged.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Upper bound for both the window and the cleanup interval.
pub const MAX_RATE_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// Server-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub workers: usize,
}

// Application-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub environment: Environment,
    pub log_level: String,
}

// Environment enum for different deployment environments
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!(
                "Invalid environment: {}. Must be one of: development, testing, production",
                s
            )),
        }
    }
}

// Result type for configuration functions
type ConfigResult<T> = Result<T, ConfigError>;

// Database Config
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub use_migrations: bool,
    pub connect_timeout_seconds: u64,
    pub create_database_if_missing: bool,
}

/// Per-client rate limiting. Applies to every rate-limited route alike.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
    pub cleanup_interval: Duration,
    /// Key clients by `Forwarded` / `X-Forwarded-For` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT,
            window: DEFAULT_RATE_WINDOW,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            trust_forwarded_headers: true,
        }
    }
}

impl RateLimitConfig {
    fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        let max_requests: usize =
            get_env_or_default("RATE_LIMIT_MAX_REQUESTS", &defaults.max_requests.to_string())?;
        let window_secs: u64 = get_env_or_default(
            "RATE_LIMIT_WINDOW_SECONDS",
            &defaults.window.as_secs().to_string(),
        )?;
        let cleanup_secs: u64 = get_env_or_default(
            "RATE_LIMIT_CLEANUP_SECONDS",
            &defaults.cleanup_interval.as_secs().to_string(),
        )?;
        let trust_forwarded_headers: bool = get_env_or_default(
            "RATE_LIMIT_TRUST_FORWARDED_HEADERS",
            &defaults.trust_forwarded_headers.to_string(),
        )?;

        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            cleanup_interval: Duration::from_secs(cleanup_secs),
            trust_forwarded_headers,
        }
        .validated()
    }

    fn validated(self) -> ConfigResult<Self> {
        if self.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_MAX_REQUESTS",
                reason: "must be at least 1".to_string(),
            });
        }
        check_duration("RATE_LIMIT_WINDOW_SECONDS", self.window)?;
        check_duration("RATE_LIMIT_CLEANUP_SECONDS", self.cleanup_interval)?;
        Ok(self)
    }
}

fn check_duration(key: &'static str, value: Duration) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must be at least 1".to_string(),
        });
    }
    if value > MAX_RATE_DURATION {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("must not exceed {}", MAX_RATE_DURATION.as_secs()),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub db: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    // Load configuration from environment variables
    pub fn load() -> ConfigResult<Self> {
        // Load .env file if it exists
        match dotenv() {
            Ok(_) => debug!(".env file loaded successfully"),
            Err(e) => warn!("Could not load .env file: {}", e),
        }

        let server = ServerConfig {
            host: get_env_or_default("SERVER_HOST", "127.0.0.1")?,
            port: get_env_or_default("SERVER_PORT", "8080")?,
            workers: get_env_or_default("SERVER_WORKERS", "4")?,
        };

        let version = env!("CARGO_PKG_VERSION").to_string();

        let app = AppConfig {
            name: get_env_or_default("APP_NAME", "url-bite")?,
            version: env::var("APP_VERSION").unwrap_or(version),
            environment: get_env_or_default("APP_ENVIRONMENT", "development")?,
            log_level: get_env_or_default("RUST_LOG", "info")?,
        };

        let db = DatabaseConfig {
            url: get_env_or_default("DATABASE_URL", "sqlite://urls.db")?,
            max_connections: get_env_or_default("DATABASE_MAX_CONNECTIONS", "5")?,
            min_connections: get_env_or_default("DATABASE_MIN_CONNECTIONS", "1")?,
            connect_timeout_seconds: get_env_or_default("DATABASE_CONNECT_TIMEOUT_SECONDS", "5")?,
            use_migrations: get_env_or_default("DATABASE_USE_MIGRATIONS", "true")?,
            create_database_if_missing: get_env_or_default(
                "DATABASE_CREATE_DATABASE_IF_MISSING",
                "true",
            )?,
        };

        let rate_limit = RateLimitConfig::from_env()?;

        let config = Config {
            server,
            app,
            db,
            rate_limit,
        };
        info!("Configuration loaded successfully");
        debug!("Loaded config: {:?}", config);

        Ok(config)
    }
}

/// Helper function to get an env variable with a default value
fn get_env_or_default<T: FromStr>(key: &str, default: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(format!("Could not parse {}: {}", key, e))),
        Err(env::VarError::NotPresent) => {
            debug!("{} not set, using default: {}", key, default);
            default.parse::<T>().map_err(|e| {
                ConfigError::ParseError(format!("Could not parse default for {}: {}", key, e))
            })
        }
        Err(e) => Err(ConfigError::EnvVarError(e)),
    }
}
