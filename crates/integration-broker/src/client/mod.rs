//! HTTP client for provider token and listing endpoints.
//!
//! Provides:
//! - Connection pooling via reqwest
//! - A mandatory request timeout (no call may hang on a slow provider)
//! - Request logging middleware
//! - Mapping of transport and status failures onto [`IntegrationError`]
//!
//! Nothing is retried here. A failed flow is re-driven by the caller.

mod middleware;

pub use middleware::UpstreamLogging;

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};

use crate::config::Config;
use crate::error::{IntegrationError, IntegrationResult};

/// Largest upstream error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 2048;

/// Upstream provider client.
#[derive(Clone)]
pub struct UpstreamClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Request timeout, reported on [`IntegrationError::UpstreamTimeout`].
    timeout: Duration,
}

impl UpstreamClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("integration-broker/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;

        let client = ClientBuilder::new(client).with(UpstreamLogging).build();

        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }

    /// Start a GET request.
    #[must_use]
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request.
    #[must_use]
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Attach a JSON body.
    pub fn json_body(
        request: RequestBuilder,
        body: &serde_json::Value,
    ) -> IntegrationResult<RequestBuilder> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            IntegrationError::protocol(format!("unencodable request body: {e}"))
        })?;
        Ok(request.header(CONTENT_TYPE, "application/json").body(bytes))
    }

    /// Attach an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form_body(request: RequestBuilder, fields: &[(&str, &str)]) -> RequestBuilder {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        request
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
    }

    /// Send a request and parse the JSON response.
    ///
    /// # Errors
    ///
    /// - [`IntegrationError::UpstreamTimeout`] when the timeout elapses
    /// - [`IntegrationError::Transport`] for connection failures
    /// - [`IntegrationError::UpstreamApi`] for non-success statuses
    /// - [`IntegrationError::UpstreamProtocol`] when the body is not JSON
    pub async fn send_json(&self, request: RequestBuilder) -> IntegrationResult<serde_json::Value> {
        let response = request
            .send()
            .await
            .map_err(|e| self.classify_middleware(e))?;
        let response = Self::handle_response(response).await?;
        let bytes = response.bytes().await.map_err(|e| self.classify(&e))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            IntegrationError::protocol(format!("response is not valid JSON: {e}"))
        })
    }

    /// Turn non-success statuses into [`IntegrationError::UpstreamApi`].
    async fn handle_response(response: reqwest::Response) -> IntegrationResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        Err(IntegrationError::upstream(status.as_u16(), body))
    }

    fn classify(&self, e: &reqwest::Error) -> IntegrationError {
        if e.is_timeout() {
            IntegrationError::UpstreamTimeout(self.timeout)
        } else if e.is_decode() {
            IntegrationError::protocol(e.to_string())
        } else {
            IntegrationError::Transport(e.to_string())
        }
    }

    fn classify_middleware(&self, e: reqwest_middleware::Error) -> IntegrationError {
        match e {
            reqwest_middleware::Error::Reqwest(ref inner) => self.classify(inner),
            other => IntegrationError::Transport(other.to_string()),
        }
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}
