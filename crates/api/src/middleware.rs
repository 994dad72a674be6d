use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use userdesk_infra::RateLimitConfig;

use crate::app::fault::Fault;
use crate::app::normalize::FaultReport;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

fn client_ip<B>(req: &axum::http::Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Logs one line per request, level chosen by status class. Faults log their
/// real classification even when the response was masked.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client = client_ip(&req).map(|ip| ip.to_string()).unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    let report = response.extensions().get::<FaultReport>();

    match report {
        Some(report) if report.status.is_server_error() => tracing::error!(
            %method,
            %path,
            %client,
            status,
            fault_status = report.status.as_u16(),
            fault = %report.message,
            detail = report.detail.as_deref().unwrap_or(""),
            duration_ms,
            "request failed"
        ),
        Some(report) => tracing::warn!(
            %method,
            %path,
            %client,
            status,
            fault_status = report.status.as_u16(),
            fault = %report.message,
            duration_ms,
            "request rejected"
        ),
        None if path == "/health" => {
            tracing::trace!(%method, %path, status, duration_ms, "health check")
        }
        None => tracing::info!(%method, %path, %client, status, duration_ms, "request"),
    }

    response
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct LimiterState {
    clients: HashMap<Option<IpAddr>, Window>,
    last_sweep: Instant,
}

/// Fixed-window request counter per client address.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `client` and report whether it is within budget.
    pub fn allow(&self, client: Option<IpAddr>, now: Instant) -> bool {
        let window = self.config.window;
        let Ok(mut state) = self.state.lock() else {
            tracing::error!("rate limiter lock poisoned; denying request");
            return false;
        };

        if now.saturating_duration_since(state.last_sweep) >= window {
            state
                .clients
                .retain(|_, w| now.saturating_duration_since(w.started) < window);
            state.last_sweep = now;
        }

        let entry = state.clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.config.max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }

}

pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, req: Request, next: Next) -> Response {
    let client = client_ip(&req);
    if !limiter.allow(client, Instant::now()) {
        tracing::debug!(?client, max = limiter.config().max_requests, "rate limit exceeded");
        return Fault::too_many_requests(RATE_LIMIT_MESSAGE).into_response();
    }
    next.run(req).await
}
