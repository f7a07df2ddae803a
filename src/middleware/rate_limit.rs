//! Fixed-window per-IP rate limiting, held in process memory. Good enough for
//! a single-instance deployment; windows reset on restart.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error,
};
use futures::future::LocalBoxFuture;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One client's window for one tier. Each entry remembers its own length so
/// eviction never cuts a longer tier's window short.
struct Window {
    start: Instant,
    count: u32,
    length: Duration,
}

lazy_static! {
    // key: "tier:client-ip"
    static ref WINDOWS: Mutex<HashMap<String, Window>> = Mutex::new(HashMap::new());
}

/// Counts a request against a window. Returns false once the window is full.
/// Expired entries (any tier, any client) are dropped on every call so the
/// map stays bounded by the set of clients active within their windows.
fn check_window(key: String, window: Duration, max: u32) -> bool {
    let now = Instant::now();
    let mut map = match WINDOWS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    map.retain(|_, w| now.duration_since(w.start) < w.length);
    let entry = map.entry(key).or_insert(Window {
        start: now,
        count: 0,
        length: window,
    });
    if entry.count >= max {
        return false;
    }
    entry.count += 1;
    true
}

#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    window: Duration,
    max: u32,
    /// When set, only requests with this method are counted (lets a tier
    /// target POST on a resource that also serves GET).
    method: Option<Method>,
    message: &'static str,
}

impl RateLimiter {
    /// General API tier: 100 requests per 15 minutes.
    pub fn api() -> Self {
        RateLimiter {
            name: "api",
            window: Duration::from_secs(15 * 60),
            max: 100,
            method: None,
            message: "Too many requests from this IP, please try again later.",
        }
    }

    /// Voting tier: 5 votes per minute.
    pub fn vote() -> Self {
        RateLimiter {
            name: "vote",
            window: Duration::from_secs(60),
            max: 5,
            method: None,
            message: "Too many vote attempts, please slow down.",
        }
    }

    /// Poll creation tier: 10 polls per hour, POST only.
    pub fn create_poll() -> Self {
        RateLimiter {
            name: "create-poll",
            window: Duration::from_secs(60 * 60),
            max: 10,
            method: Some(Method::POST),
            message: "Too many polls created, please try again later.",
        }
    }

    /// Results tier: 30 views per minute.
    pub fn results() -> Self {
        RateLimiter {
            name: "results",
            window: Duration::from_secs(60),
            max: 30,
            method: None,
            message: "Too many requests, please try again later.",
        }
    }

    /// Auth tier: 5 attempts per 15 minutes.
    pub fn auth() -> Self {
        RateLimiter {
            name: "auth",
            window: Duration::from_secs(15 * 60),
            max: 5,
            method: None,
            message: "Too many login attempts, please try again later.",
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimiterService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterService {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterService<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(method) = &self.limiter.method {
            if req.method() != method {
                let fut = self.service.call(req);
                return Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                });
            }
        }

        let ip = {
            let info = req.connection_info();
            info.realip_remote_addr().unwrap_or("unknown").to_string()
        };
        let key = format!("{}:{}", self.limiter.name, ip);

        if check_window(key, self.limiter.window, self.limiter.max) {
            let fut = self.service.call(req);
            Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            })
        } else {
            log::warn!("⛔ Rate limit hit: tier {} ip {}", self.limiter.name, ip);
            // Same `{ success: false, error }` JSON shape the handlers return
            let response = actix_web::HttpResponse::TooManyRequests().json(serde_json::json!({
                "success": false,
                "error": self.limiter.message
            }));
            let res = req.into_response(response).map_into_right_body();
            Box::pin(async move { Ok(res) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{web, App, HttpResponse};

    #[test]
    fn test_window_fills_up() {
        let key = "test-fill:10.0.0.1".to_string();
        for _ in 0..5 {
            assert!(check_window(key.clone(), Duration::from_secs(60), 5));
        }
        assert!(!check_window(key.clone(), Duration::from_secs(60), 5));
        assert!(!check_window(key, Duration::from_secs(60), 5));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let key = "test-reset:10.0.0.2".to_string();
        assert!(check_window(key.clone(), Duration::ZERO, 1));
        // Zero-length window: every call starts a fresh one
        assert!(check_window(key.clone(), Duration::ZERO, 1));
        assert!(check_window(key, Duration::ZERO, 1));
    }

    #[test]
    fn test_windows_are_keyed_per_client() {
        assert!(check_window("test-key:1.1.1.1".to_string(), Duration::from_secs(60), 1));
        assert!(check_window("test-key:2.2.2.2".to_string(), Duration::from_secs(60), 1));
        assert!(!check_window("test-key:1.1.1.1".to_string(), Duration::from_secs(60), 1));
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let stale = "test-evict-stale:3.3.3.3".to_string();
        assert!(check_window(stale.clone(), Duration::ZERO, 1));
        // Any later check sweeps expired entries from the whole map
        assert!(check_window(
            "test-evict-other:4.4.4.4".to_string(),
            Duration::from_secs(60),
            1,
        ));
        let map = WINDOWS.lock().unwrap();
        assert!(!map.contains_key(&stale));
        drop(map);
    }

    #[test]
    fn test_eviction_spares_live_entries() {
        let live = "test-evict-live:5.5.5.5".to_string();
        assert!(check_window(live.clone(), Duration::from_secs(600), 10));
        assert!(check_window(
            "test-evict-live:6.6.6.6".to_string(),
            Duration::from_secs(60),
            1,
        ));
        let map = WINDOWS.lock().unwrap();
        assert_eq!(map.get(&live).map(|w| w.count), Some(1));
        drop(map);
    }

    #[actix_web::test]
    async fn test_limit_exceeded_returns_json_429() {
        async fn ok() -> HttpResponse {
            HttpResponse::Ok().json(serde_json::json!({ "success": true }))
        }

        let limiter = RateLimiter {
            name: "test-json-429",
            window: Duration::from_secs(60),
            max: 1,
            method: None,
            message: "Too many requests, please try again later.",
        };
        let app = actix_web::test::init_service(
            App::new().service(
                web::resource("/limited")
                    .wrap(limiter)
                    .route(web::get().to(ok)),
            ),
        )
        .await;

        let req = actix_web::test::TestRequest::get().uri("/limited").to_request();
        let res = actix_web::test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::OK);

        let req = actix_web::test::TestRequest::get().uri("/limited").to_request();
        let res = actix_web::test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.headers()
                .get(actix_web::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json"),
        );

        let body: serde_json::Value = actix_web::test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Too many requests, please try again later.");
    }
}
