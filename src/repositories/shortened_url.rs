use async_trait::async_trait;
use log::{debug, error};
use sqlx::SqlitePool;

use crate::db::Database;
use crate::errors::RepositoryError;
use crate::models::{NewShortenedUrl, ShortenedUrl};

type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortenedUrlRepositoryTrait {
    /// Persists a new short id mapping
    ///
    /// ### Returns
    /// * `Result<ShortenedUrl>` - The stored record, including its row id
    ///
    /// ### Errors
    /// * `RepositoryError::Conflict` - If the short id is already taken
    /// * `RepositoryError::Database` - If a database error occurs
    async fn save(&self, url: &NewShortenedUrl) -> Result<ShortenedUrl>;

    /// Finds a shortened URL by its short id
    ///
    /// ### Returns
    /// * `Result<Option<ShortenedUrl>>` - The record if found, or `None`
    ///
    /// ### Errors
    /// * `RepositoryError::Database` - If a database error occurs
    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ShortenedUrl>>;
}

// Implementation backed by SQLite
pub struct ShortenedUrlRepository {
    pool: SqlitePool,
}

impl ShortenedUrlRepository {
    pub fn new(db: Database) -> Self {
        Self {
            pool: db.get_pool().clone(),
        }
    }
}

#[async_trait]
impl ShortenedUrlRepositoryTrait for ShortenedUrlRepository {
    async fn save(&self, url: &NewShortenedUrl) -> Result<ShortenedUrl> {
        let record = sqlx::query_as::<_, ShortenedUrl>(
            r#"
                INSERT INTO urls (short_id, original_url, created_at)
                VALUES (?, ?, ?)
                RETURNING id, short_id, original_url, created_at
            "#,
        )
        .bind(&url.short_id)
        .bind(&url.original_url)
        .bind(url.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert shortened URL: {}", e);
            RepositoryError::from(e)
        })?;

        debug!("Stored short id '{}' with row id {}", record.short_id, record.id);
        Ok(record)
    }

    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ShortenedUrl>> {
        sqlx::query_as::<_, ShortenedUrl>(
            r#"
                SELECT id, short_id, original_url, created_at
                FROM urls
                WHERE short_id = ?
            "#,
        )
        .bind(short_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::Database)
    }
}
