//! Request security: token authentication and per-client throttling.
//!
//! Both are off by default. Setting `TRACKLINE_API_KEY` switches the API
//! from open local mode to token mode and enables the request throttle,
//! which is the intended configuration for anything network-facing.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

/// Whether requests must carry a bearer token.
#[derive(Clone, Debug, Default)]
pub enum AccessPolicy {
    /// No authentication; local single-user mode.
    #[default]
    Open,
    /// Every request must present this token as `Authorization: Bearer`.
    RequireToken(String),
}

/// Security settings for the router, read from the environment at startup.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub policy: AccessPolicy,
    /// Allowed CORS origins (from TRACKLINE_CORS_ORIGINS, comma-separated).
    /// `None` leaves CORS permissive.
    pub cors_origins: Option<Vec<String>>,
    pub throttle: Option<Throttle>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let policy = match std::env::var("TRACKLINE_API_KEY") {
            Ok(token) => AccessPolicy::RequireToken(token),
            Err(_) => AccessPolicy::Open,
        };

        let cors_origins = std::env::var("TRACKLINE_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        let per_minute = std::env::var("TRACKLINE_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        // Throttling only matters once the server is exposed enough to
        // need a token.
        let throttle = match policy {
            AccessPolicy::RequireToken(_) => {
                Some(Throttle::new(per_minute, Duration::from_secs(60)))
            }
            AccessPolicy::Open => None,
        };

        Self {
            policy,
            cors_origins,
            throttle,
        }
    }

    /// Open access, no throttle. The mode used by tests and local runs.
    pub fn disabled() -> Self {
        Self {
            policy: AccessPolicy::Open,
            cors_origins: None,
            throttle: None,
        }
    }

    pub fn with_api_key(token: impl Into<String>) -> Self {
        Self {
            policy: AccessPolicy::RequireToken(token.into()),
            cors_origins: None,
            throttle: None,
        }
    }

    pub fn with_rate_limit(per_minute: u32) -> Self {
        Self {
            policy: AccessPolicy::Open,
            cors_origins: None,
            throttle: Some(Throttle::new(per_minute, Duration::from_secs(60))),
        }
    }

    pub fn requires_token(&self) -> bool {
        matches!(self.policy, AccessPolicy::RequireToken(_))
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Fixed-window request throttle keyed by client IP.
///
/// Each client gets a counting window of `period` length starting at its
/// first request; once `limit` requests land in the window the rest are
/// refused until the window lapses. Lapsed windows are evicted on every
/// admission check, so the map stays bounded by currently active clients.
#[derive(Clone, Debug)]
pub struct Throttle {
    limit: u32,
    period: Duration,
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    hits: u32,
}

impl Throttle {
    pub fn new(limit: u32, period: Duration) -> Self {
        Self {
            limit,
            period,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request from `ip` and decide whether to admit it.
    pub fn admit(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("throttle lock poisoned");

        windows.retain(|_, w| now.duration_since(w.opened) < self.period);

        let window = windows.entry(ip).or_insert(Window {
            opened: now,
            hits: 0,
        });
        window.hits += 1;
        window.hits <= self.limit
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows.lock().expect("throttle lock poisoned").len()
    }
}

/// Reject requests that do not carry the expected bearer token.
pub async fn require_token(
    State(policy): State<AccessPolicy>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = match &policy {
        AccessPolicy::Open => return Ok(next.run(request).await),
        AccessPolicy::RequireToken(token) => token,
    };

    match bearer_token(&request) {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Rejected request with wrong API token");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Rejected request without a bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Refuse requests from clients that exhausted their window.
pub async fn throttle_requests(
    State(throttle): State<Throttle>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request);

    if throttle.admit(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Throttled {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Best-effort client address: proxy headers first, else localhost.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    forwarded
        .or(real_ip)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn throttle_admits_up_to_the_limit_then_refuses() {
        let throttle = Throttle::new(3, Duration::from_secs(60));

        assert!(throttle.admit(ip(1)));
        assert!(throttle.admit(ip(1)));
        assert!(throttle.admit(ip(1)));
        assert!(!throttle.admit(ip(1)));
        assert!(!throttle.admit(ip(1)));
    }

    #[test]
    fn throttle_counts_each_client_separately() {
        let throttle = Throttle::new(1, Duration::from_secs(60));

        assert!(throttle.admit(ip(1)));
        assert!(!throttle.admit(ip(1)));
        assert!(throttle.admit(ip(2)));
    }

    #[test]
    fn lapsed_window_resets_the_count() {
        let throttle = Throttle::new(1, Duration::from_millis(1));

        assert!(throttle.admit(ip(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(throttle.admit(ip(1)));
    }

    #[test]
    fn lapsed_windows_are_evicted() {
        let throttle = Throttle::new(10, Duration::from_millis(1));

        for last in 1..=4 {
            throttle.admit(ip(last));
        }
        assert_eq!(throttle.tracked_clients(), 4);

        std::thread::sleep(Duration::from_millis(5));
        throttle.admit(ip(9));
        // Only the fresh window survives the sweep
        assert_eq!(throttle.tracked_clients(), 1);
    }

    #[test]
    fn disabled_config_is_open_with_no_throttle() {
        let config = SecurityConfig::disabled();
        assert!(!config.requires_token());
        assert!(config.cors_origins.is_none());
        assert!(config.throttle.is_none());
    }

    #[test]
    fn api_key_config_requires_a_token() {
        let config = SecurityConfig::with_api_key("test-key");
        assert!(config.requires_token());
        match config.policy {
            AccessPolicy::RequireToken(token) => assert_eq!(token, "test-key"),
            AccessPolicy::Open => panic!("expected token policy"),
        }
    }
}
