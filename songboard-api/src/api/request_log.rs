//! Per-request access log
//!
//! One event per completed request: `info` for success, `warn` for 4xx,
//! `error` for 5xx. Headers and bodies are never logged.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::context::RequestContext;

pub async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (request_id, caller_id, caller_role) = match request.extensions().get::<RequestContext>() {
        Some(ctx) => (
            ctx.request_id.clone(),
            ctx.actor_id(),
            ctx.role().map_or("guest", |r| r.as_str()),
        ),
        None => (String::new(), None, "guest"),
    };

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    if response.status().is_server_error() {
        error!(%method, %path, status, duration_ms, ?caller_id, caller_role, %request_id, "Request failed");
    } else if response.status().is_client_error() {
        warn!(%method, %path, status, duration_ms, ?caller_id, caller_role, %request_id, "Request rejected");
    } else {
        info!(%method, %path, status, duration_ms, ?caller_id, caller_role, %request_id, "Request completed");
    }

    response
}
