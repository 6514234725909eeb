mod shortened_url;

pub use shortened_url::{CreateShortUrlDto, NewShortenedUrl, ShortUrlResponseDto, ShortenedUrl};
