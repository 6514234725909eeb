use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Unique constraint violation, e.g. a short id that is already taken
    #[error("Conflict error: {0}")]
    Conflict(String),
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => Self::NotFound("Resource not found".to_string()),
            SqlxError::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict("Resource already exists".to_string())
            }
            _ => Self::Database(err),
        }
    }
}
