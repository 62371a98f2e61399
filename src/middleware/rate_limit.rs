// 固定窗口限流：每个客户端IP一个计数窗口，窗口过期整体替换。
// 进程内HashMap存储，单实例部署，不做跨实例一致性。

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::utils::{error_codes, error_to_api_response};

struct RateLimitWindow {
    count: u32,
    reset_at: i64,
}

pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
}

pub struct RateLimiter {
    limit: u32,
    window_secs: i64,
    windows: Mutex<HashMap<String, RateLimitWindow>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window_secs: window.as_secs() as i64,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now().timestamp())
    }

    fn check_at(&self, key: &str, now: i64) -> RateLimitDecision {
        let mut windows = self.windows.lock().expect("rate limit lock poisoned");
        let window = windows.entry(key.to_string()).or_insert(RateLimitWindow {
            count: 0,
            reset_at: now + self.window_secs,
        });

        // 窗口到期后整体替换，不按比例衰减
        if now >= window.reset_at {
            *window = RateLimitWindow {
                count: 0,
                reset_at: now + self.window_secs,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: window.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            reset_at: window.reset_at,
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    // 优先信任反向代理头，没有则退回连接IP
    let ip = req
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or_else(|| remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string();

    let decision = limiter.check(&ip);

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        tracing::warn!(ip = %ip, "Rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            error_to_api_response(error_codes::RATE_LIMITED, "请求过于频繁，请稍后重试".to_string()),
        )
            .into_response()
    };

    // 限流头在放行和拒绝的响应上都要带
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_first_request_is_rejected() {
        let limiter = RateLimiter::new(60, Duration::from_secs(60));

        for i in 1..=60 {
            let decision = limiter.check_at("1.2.3.4", 1000);
            assert!(decision.allowed, "request {} should pass", i);
            assert_eq!(decision.remaining, 60 - i);
        }

        let decision = limiter.check_at("1.2.3.4", 1000);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_at, 1060);
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(60, Duration::from_secs(60));

        for _ in 0..61 {
            limiter.check_at("1.2.3.4", 1000);
        }
        assert!(!limiter.check_at("1.2.3.4", 1059).allowed);

        // 窗口过期后换新窗口重新计数
        let decision = limiter.check_at("1.2.3.4", 1060);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 59);
        assert_eq!(decision.reset_at, 1120);
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check_at("1.2.3.4", 1000).allowed);
        assert!(!limiter.check_at("1.2.3.4", 1001).allowed);
        assert!(limiter.check_at("unknown", 1001).allowed);
    }
}
