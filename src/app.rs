use std::sync::Arc;
use std::time::Instant;

use actix_cors::Cors;
use actix_web::{
    http::{header, Method},
    web, App, HttpRequest, HttpServer,
};
use log::{debug, info, warn};
use tokio::sync::watch;
use tracing_actix_web::TracingLogger;

use crate::{
    config::{Config, Environment},
    db::Database,
    errors::AppError,
    middleware::{RateLimiter, RequestId},
    rate_limit::{RateLimitStore, Reclaimer},
    routes, services, telemetry,
    types::AppState,
};

pub type AppResult<T> = Result<T, AppError>;

pub(crate) fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods([Method::GET, Method::POST, Method::PUT])
        .allowed_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .supports_credentials()
}

// Malformed or missing JSON bodies get the same answer as an invalid URL
pub(crate) fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(32 * 1024)
        .error_handler(|err, _req: &HttpRequest| {
            debug!("Rejected JSON payload: {}", err);
            AppError::Validation("Invalid URL format".to_string()).into()
        })
}

pub async fn server() -> AppResult<()> {
    let config = Config::load()?;

    telemetry::init(&config)?;

    let start_time = Instant::now();

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {:?}", config.app.environment);
    info!(
        "Binding to {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );
    info!(
        "Rate limit: {} requests per {}s per client, cleanup every {}s",
        config.rate_limit.max_requests,
        config.rate_limit.window.as_secs(),
        config.rate_limit.cleanup_interval.as_secs()
    );
    if !config.rate_limit.trust_forwarded_headers {
        info!("Rate limiter keys clients by peer address, forwarding headers ignored");
    }

    if config.app.environment == Environment::Development {
        debug!("Full configuration: {:?}", config);
    }

    let db = Database::connect(&config.db).await?;

    let rate_limits = Arc::new(RateLimitStore::new(&config.rate_limit));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reclaimer = Reclaimer::new(rate_limits.clone(), config.rate_limit.cleanup_interval)
        .spawn(shutdown_rx);

    let app_db = db.clone();
    let app_rate_limits = rate_limits.clone();
    let version = config.app.version.clone();
    let trust_forwarded_headers = config.rate_limit.trust_forwarded_headers;

    let served = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(AppState {
                start_time,
                db: app_db.clone(),
                rate_limits: app_rate_limits.clone(),
                version: version.clone(),
            }))
            .app_data(json_config())
            .configure(|cfg| services::register(app_db.clone(), cfg))
            .wrap(cors())
            .wrap(TracingLogger::default())
            .wrap(RequestId)
            .configure(|cfg| {
                routes::configure_routes(
                    cfg,
                    RateLimiter::new(app_rate_limits.clone())
                        .trust_forwarded_headers(trust_forwarded_headers),
                )
            })
    })
    .workers(config.server.workers)
    .bind((config.server.host.to_string(), config.server.port))?
    .run()
    .await;

    info!("HTTP server stopped, shutting down background tasks");
    let _ = shutdown_tx.send(true);
    if let Err(e) = reclaimer.await {
        warn!("Rate limiter cleanup task ended abnormally: {}", e);
    }
    db.shutdown().await;

    served.map_err(AppError::from)
}
