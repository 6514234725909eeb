use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::rate_limit::{Decision, RateLimitStore};

/// Per-client admission control in front of the wrapped services.
///
/// Clients are keyed by their resolved IP (`Forwarded` / `X-Forwarded-For`
/// aware unless disabled). Rejected requests get a 429 and never reach the
/// inner service.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
    trust_forwarded_headers: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<RateLimitStore>) -> Self {
        Self {
            store,
            trust_forwarded_headers: true,
        }
    }

    /// With `false`, clients are keyed by the socket peer address only.
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service,
            store: self.store.clone(),
            trust_forwarded_headers: self.trust_forwarded_headers,
        })
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    store: Arc<RateLimitStore>,
    trust_forwarded_headers: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ip = client_identifier(&req, self.trust_forwarded_headers);
        let path = req.path().to_owned();

        info!(ip = %ip, path = %path, "Request received");

        match self.store.evaluate(&ip) {
            Decision::Allow => {
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Decision::Deny => {
                warn!(
                    ip = %ip,
                    path = %path,
                    limit = self.store.max_requests(),
                    window_secs = self.store.window().as_secs(),
                    "Rate limit exceeded"
                );
                let response = AppError::RateLimited.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}

/// Resolved client address; an unknown peer maps to the empty identifier.
fn client_identifier(req: &ServiceRequest, trust_forwarded_headers: bool) -> String {
    let info = req.connection_info();
    let addr = if trust_forwarded_headers {
        info.realip_remote_addr()
    } else {
        info.peer_addr()
    };
    addr.unwrap_or_default().to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::Mutex;
    use std::time::Duration;

    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use serde_json::{json, Value};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};

    use super::*;
    use crate::config::RateLimitConfig;
    use crate::rate_limit::ManualClock;

    fn store() -> (Arc<RateLimitStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(RateLimitStore::with_clock(
            &RateLimitConfig::default(),
            clock.clone(),
        ));
        (store, clock)
    }

    fn from(ip: &str, path: &str) -> actix_web::test::TestRequest {
        test::TestRequest::get()
            .uri(path)
            .insert_header(("X-Forwarded-For", ip.to_string()))
    }

    macro_rules! limited_app {
        ($limiter:expr) => {
            test::init_service(
                App::new()
                    .wrap($limiter)
                    .route("/{tail:.*}", web::get().to(|| async { HttpResponse::Ok().body("ok") })),
            )
            .await
        };
    }

    #[derive(Debug)]
    struct CapturedEvent {
        level: Level,
        fields: HashMap<String, String>,
    }

    impl CapturedEvent {
        fn field(&self, name: &str) -> Option<&str> {
            self.fields.get(name).map(String::as_str)
        }
    }

    /// Collects every event emitted on the current thread.
    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<CapturedEvent>>>);

    impl EventLog {
        fn with_message(&self, level: Level, message: &str) -> Vec<HashMap<String, String>> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.level == level && e.field("message") == Some(message))
                .map(|e| e.fields.clone())
                .collect()
        }
    }

    struct FieldRecorder<'a>(&'a mut HashMap<String, String>);

    impl Visit for FieldRecorder<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    impl<S: Subscriber> Layer<S> for EventLog {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            let mut fields = HashMap::new();
            event.record(&mut FieldRecorder(&mut fields));
            self.0.lock().unwrap().push(CapturedEvent {
                level: *event.metadata().level(),
                fields,
            });
        }
    }

    #[actix_web::test]
    async fn test_allows_up_to_limit_then_rejects() {
        let (store, clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()));

        for _ in 0..3 {
            let res = test::call_service(&app, from("1.2.3.4", "/abc").to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
            clock.advance(Duration::from_millis(250));
        }
        clock.advance(Duration::from_secs(1));

        let res = test::call_service(&app, from("1.2.3.4", "/abc").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "error": "Rate limit exceeded. Try again later." }));
    }

    #[actix_web::test]
    async fn test_limit_is_per_client_not_per_route() {
        let (store, _clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()));

        for path in ["/a", "/b", "/shorten"] {
            let res = test::call_service(&app, from("1.2.3.4", path).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = test::call_service(&app, from("1.2.3.4", "/c").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let res = test::call_service(&app, from("5.6.7.8", "/c").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_client_allowed_again_after_window() {
        let (store, clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()));

        for _ in 0..4 {
            test::call_service(&app, from("1.2.3.4", "/x").to_request()).await;
        }
        clock.advance(Duration::from_secs(61));

        let res = test::call_service(&app, from("1.2.3.4", "/x").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_peer_address_used_without_forwarding_headers() {
        let (store, _clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()));

        let req = test::TestRequest::get()
            .uri("/x")
            .peer_addr("10.0.0.9:40000".parse().unwrap())
            .to_request();
        test::call_service(&app, req).await;

        assert_eq!(store.recorded_requests("10.0.0.9"), Some(1));
    }

    #[actix_web::test]
    async fn test_unknown_client_shares_empty_bucket() {
        let (store, _clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()));

        for _ in 0..3 {
            let req = test::TestRequest::get().uri("/x").to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get().uri("/x").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(store.recorded_requests(""), Some(3));
    }

    #[actix_web::test]
    async fn test_logs_every_request_and_each_rejection() {
        let events = EventLog::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));
        let (store, _clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()));

        for _ in 0..4 {
            test::call_service(&app, from("1.2.3.4", "/abc").to_request()).await;
        }

        let received = events.with_message(Level::INFO, "Request received");
        assert_eq!(received.len(), 4);
        for fields in &received {
            assert_eq!(fields.get("ip").map(String::as_str), Some("1.2.3.4"));
            assert_eq!(fields.get("path").map(String::as_str), Some("/abc"));
        }

        let rejected = events.with_message(Level::WARN, "Rate limit exceeded");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].get("ip").map(String::as_str), Some("1.2.3.4"));
        assert_eq!(rejected[0].get("path").map(String::as_str), Some("/abc"));
        assert_eq!(rejected[0].get("limit").map(String::as_str), Some("3"));
    }

    #[actix_web::test]
    async fn test_forwarding_headers_ignored_when_untrusted() {
        let (store, _clock) = store();
        let app = limited_app!(RateLimiter::new(store.clone()).trust_forwarded_headers(false));

        for i in 0..3 {
            let req = from(&format!("9.9.9.{}", i), "/x")
                .peer_addr("10.0.0.9:40000".parse().unwrap())
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = from("9.9.9.200", "/x")
            .peer_addr("10.0.0.9:40000".parse().unwrap())
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(store.tracked_clients(), 1);
        assert_eq!(store.recorded_requests("10.0.0.9"), Some(3));
    }
}
