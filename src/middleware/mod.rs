mod rate_limiter;
mod request_id;

pub use rate_limiter::RateLimiter;
pub use request_id::RequestId;
#[cfg(test)]
pub use request_id::REQUEST_ID_HEADER;
