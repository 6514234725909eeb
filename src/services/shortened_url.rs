use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use validator::Validate;

use crate::errors::{AppError, RepositoryError};
use crate::models::{CreateShortUrlDto, NewShortenedUrl, ShortenedUrl};
use crate::repositories::ShortenedUrlRepositoryTrait;
use crate::types::Result;
use crate::utils::id_generator::{generate_short_id, SHORT_ID_LENGTH};

/// Attempts at finding an unused short id before giving up
const MAX_ID_ATTEMPTS: usize = 5;

#[async_trait]
pub trait ShortenedUrlServiceTrait {
    /// Validates and stores `dto.original_url` under a fresh short id
    async fn shorten(&self, dto: CreateShortUrlDto) -> Result<ShortenedUrl>;

    /// Returns the original URL stored under `short_id`
    async fn resolve(&self, short_id: &str) -> Result<String>;
}

pub struct ShortenedUrlService<T: ShortenedUrlRepositoryTrait> {
    repository: Arc<T>,
}

impl<T: ShortenedUrlRepositoryTrait> ShortenedUrlService<T> {
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<T: ShortenedUrlRepositoryTrait + Send + Sync> ShortenedUrlServiceTrait
    for ShortenedUrlService<T>
{
    async fn shorten(&self, dto: CreateShortUrlDto) -> Result<ShortenedUrl> {
        if let Err(e) = dto.validate() {
            warn!("Rejected URL '{}': {}", dto.original_url, e);
            return Err(AppError::Validation("Invalid URL format".to_string()));
        }

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let new_url = NewShortenedUrl {
                short_id: generate_short_id(SHORT_ID_LENGTH),
                original_url: dto.original_url.clone(),
                created_at: Utc::now(),
            };

            // The UNIQUE index is the source of truth for collisions
            match self.repository.save(&new_url).await {
                Ok(record) => {
                    info!("Shortened '{}' to '{}'", record.original_url, record.short_id);
                    return Ok(record);
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!(
                        "Short id '{}' already taken (attempt {}/{})",
                        new_url.short_id, attempt, MAX_ID_ATTEMPTS
                    );
                }
                Err(e) => {
                    error!("Failed to store shortened URL: {}", e);
                    return Err(AppError::Internal("Failed to create short URL".to_string()));
                }
            }
        }

        error!(
            "Failed to generate a unique short id after {} attempts",
            MAX_ID_ATTEMPTS
        );
        Err(AppError::Internal("Failed to create short URL".to_string()))
    }

    async fn resolve(&self, short_id: &str) -> Result<String> {
        match self.repository.find_by_short_id(short_id).await {
            Ok(Some(url)) => Ok(url.original_url),
            Ok(None) => Err(AppError::NotFound("Short URL not found".to_string())),
            Err(e) => {
                error!("Failed to look up short id '{}': {}", short_id, e);
                Err(AppError::Internal("Internal server error".to_string()))
            }
        }
    }
}
