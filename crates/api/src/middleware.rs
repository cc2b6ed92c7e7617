use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info, info_span, Instrument};

/// Wrap each request in a span and log its outcome.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let span = info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let started = Instant::now();
        let response = next.run(req).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}
