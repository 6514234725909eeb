//! In-memory, per-client sliding-window rate limiting.
//!
//! [`RateLimitStore`] holds the request log and makes admission decisions,
//! [`Reclaimer`] drops clients that have gone quiet. The HTTP side lives in
//! [`crate::middleware::RateLimiter`].

mod clock;
mod reclaimer;
mod store;

#[cfg(test)]
pub use clock::ManualClock;
pub use reclaimer::Reclaimer;
pub use store::{Decision, RateLimitStore};
