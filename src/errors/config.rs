use std::env::VarError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable exists but could not be read.
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    /// A value could not be parsed into its target type.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A value parsed fine but is outside the accepted range.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
