//! 核心中间件模块

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

use super::session::ACTOR_ID_HEADER;

/// 请求日志中间件
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let signed_in = req.headers().contains_key(ACTOR_ID_HEADER);

    let response = next.run(req).await;
    let status = response.status();
    let duration = start.elapsed();

    if status.is_server_error() {
        warn!(
            "{} {} - {} - {}ms - signed_in: {} - User-Agent: {:?}",
            method,
            uri,
            status,
            duration.as_millis(),
            signed_in,
            user_agent
        );
    } else {
        info!(
            "{} {} - {} - {}ms - signed_in: {} - User-Agent: {:?}",
            method,
            uri,
            status,
            duration.as_millis(),
            signed_in,
            user_agent
        );
    }

    response
}
