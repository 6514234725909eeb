use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::validations::validate_url;

/// Request body for `POST /shorten`
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateShortUrlDto {
    #[validate(custom(function = "validate_url"))]
    pub original_url: String,
}

/// A short id to be persisted
#[derive(Debug, Clone)]
pub struct NewShortenedUrl {
    pub short_id: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}

/// A stored mapping from short id to the original URL
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ShortenedUrl {
    pub id: i64,

    /// Public identifier used in the short link
    pub short_id: String,

    /// The original, long URL
    pub original_url: String,

    pub created_at: DateTime<Utc>,
}

/// Response body for `POST /shorten`
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortUrlResponseDto {
    pub short_url: String,
}

impl ShortUrlResponseDto {
    pub fn new(base_url: &str, short_id: &str) -> Self {
        Self {
            short_url: format!("{}/{}", base_url.trim_end_matches('/'), short_id),
        }
    }
}
