//! Middleware for the upstream HTTP client.
//!
//! Logs every provider call with method, host, path, status and latency.
//! Query strings are left out since they may carry codes or cursors.

use std::time::Instant;

use axum::http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Request/response logging for provider calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamLogging;

#[async_trait::async_trait]
impl Middleware for UpstreamLogging {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let host = req.url().host_str().unwrap_or_default().to_owned();
        let path = req.url().path().to_owned();
        let started = Instant::now();

        let result = next.run(req, extensions).await;
        let elapsed_ms = started.elapsed().as_millis();

        match result {
            Ok(ref response) if response.status().is_success() => {
                let status = response.status().as_u16();
                tracing::debug!(%method, %host, %path, status, elapsed_ms, "Upstream call");
            }
            Ok(ref response) => {
                let status = response.status().as_u16();
                tracing::warn!(
                    %method,
                    %host,
                    %path,
                    status,
                    elapsed_ms,
                    "Upstream call failed"
                );
            }
            Err(ref e) => {
                tracing::warn!(
                    %method,
                    %host,
                    %path,
                    elapsed_ms,
                    error = %e,
                    "Upstream call errored"
                );
            }
        }

        result
    }
}
