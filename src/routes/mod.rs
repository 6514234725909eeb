use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::middleware::RateLimiter;
use crate::types::{AppState, HealthStatus};

mod shortened_url;

// Liveness probe, answers GET and HEAD
async fn ping() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "pong" }))
}

async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let status = HealthStatus {
        status: String::from("OK"),
        version: data.version.clone(),
        db_health: data.db.health_check().await,
        rate_limited_clients: data.rate_limits.tracked_clients(),
        uptime_seconds: data.start_time.elapsed().as_secs(),
    };

    HttpResponse::Ok().json(status)
}

/// Registers every route. Probes come first so the catch-all short id
/// route never sees them and they stay exempt from rate limiting.
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: RateLimiter) {
    cfg.service(
        web::resource("/ping")
            .route(web::get().to(ping))
            .route(web::head().to(ping)),
    )
    .route("/health", web::get().to(health_check));

    shortened_url::configure_routes(cfg, limiter);
}
