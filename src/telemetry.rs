use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, Environment};
use crate::errors::AppError;

/// Default filter directives when `RUST_LOG` is not set
fn default_directives(config: &Config) -> String {
    match config.app.environment {
        Environment::Development => config.app.log_level.clone(),
        Environment::Testing => "debug,actix_web=info".to_string(),
        Environment::Production => "info,actix_web=warn".to_string(),
    }
}

/// Installs the global `tracing` subscriber.
///
/// Production logs are JSON lines, other environments get compact text.
/// Records emitted through the `log` facade are forwarded to the same sink.
pub fn init(config: &Config) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config)))
        .map_err(|e| AppError::Logger(format!("Invalid log filter: {}", e)))?;

    let result = match config.app.environment {
        Environment::Production => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
        _ => fmt().compact().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))
}
