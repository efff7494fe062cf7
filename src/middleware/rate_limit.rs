use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the oldest in-window request falls out.
    pub retry_after_secs: u64,
}

/// Sliding-window limiter keyed by client IP: at most `max_requests`
/// timestamps inside the trailing `window`. Timestamps for a client are
/// pruned on every check; fully drained clients are dropped by the periodic
/// `prune` sweep so the map stays bounded.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Decision {
        let mut clients = self.clients.lock().expect("rate limiter mutex poisoned");
        let stamps = clients.entry(client.to_string()).or_default();

        while let Some(oldest) = stamps.front() {
            if now.duration_since(*oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if (stamps.len() as u32) < self.max_requests {
            stamps.push_back(now);
            Decision {
                allowed: true,
                remaining: self.max_requests - stamps.len() as u32,
                retry_after_secs: 0,
            }
        } else {
            let retry_after = stamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            Decision {
                allowed: false,
                remaining: 0,
                retry_after_secs: retry_after.as_secs().max(1),
            }
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Drops expired timestamps and empty clients. Run periodically so idle
    /// clients do not accumulate.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        let mut clients = self.clients.lock().expect("rate limiter mutex poisoned");
        clients.retain(|_, stamps| {
            while let Some(oldest) = stamps.front() {
                if now.duration_since(*oldest) >= self.window {
                    stamps.pop_front();
                } else {
                    break;
                }
            }
            !stamps.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .expect("rate limiter mutex poisoned")
            .len()
    }
}

/// Client identity for limiting: first hop of `x-forwarded-for` when the
/// service sits behind a proxy, else a shared bucket.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers());
    let decision = limiter.check(&ip);

    if !decision.allowed {
        let body = Json(json!({
            "error": "Too many requests",
            "retryAfter": decision.retry_after_secs,
        }));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        set_header(
            &mut response,
            "retry-after",
            &decision.retry_after_secs.to_string(),
        );
        set_limit_headers(&mut response, &limiter, &decision);
        return response;
    }

    let mut response = next.run(req).await;
    set_limit_headers(&mut response, &limiter, &decision);
    response
}

pub fn set_limit_headers(response: &mut Response, limiter: &RateLimiter, decision: &Decision) {
    set_header(
        response,
        "x-ratelimit-limit",
        &limiter.max_requests().to_string(),
    );
    set_header(
        response,
        "x-ratelimit-remaining",
        &decision.remaining.to_string(),
    );
    set_header(
        response,
        "x-ratelimit-reset",
        &limiter.window_secs().to_string(),
    );
}

fn set_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}
