use actix_web::web;

use crate::handlers::{redirect_handler, shorten_handler};
use crate::middleware::RateLimiter;

// Both routes sit behind the per-client rate limiter
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: RateLimiter) {
    cfg.service(
        web::scope("")
            .wrap(limiter)
            .route("/shorten", web::post().to(shorten_handler))
            .route("/{short_id}", web::get().to(redirect_handler)),
    );
}
