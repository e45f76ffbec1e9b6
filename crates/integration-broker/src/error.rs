//! Error types for the integration broker.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

use axum::http::StatusCode;

/// Errors from the ephemeral cache layer.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Redis connection or command failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Value could not be encoded for storage
    #[error("Failed to encode cache value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced by the OAuth flow, the credential broker and the provider adapters.
#[derive(thiserror::Error, Debug)]
pub enum IntegrationError {
    /// The provider (or the user) declined the authorization request.
    #[error("Authorization denied: {error}")]
    AuthorizationDenied {
        /// Error code reported by the provider (e.g. `access_denied`)
        error: String,
        /// Optional human-readable description from the provider
        description: Option<String>,
    },

    /// The opaque state could not be decoded.
    #[error("Malformed state parameter")]
    MalformedState,

    /// The decoded nonce does not match the stored nonce.
    #[error("State nonce mismatch")]
    StateMismatch,

    /// No state is stored for the (provider, org, user) tuple.
    #[error("State expired or missing")]
    StateExpiredOrMissing,

    /// Required request parameter is missing or invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller-supplied credential blob is unusable.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Nothing to take: never stored, already consumed or expired.
    #[error("No credentials found")]
    NoCredentials,

    /// The cache held a value that is not valid JSON.
    #[error("Corrupted credentials: {0}")]
    CorruptedCredentials(String),

    /// Provider name is not in the registry.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider answered with a non-success status.
    #[error("Upstream error ({status}): {body}")]
    UpstreamApi {
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body, kept for diagnostics
        body: String,
    },

    /// Provider did not answer within the client timeout.
    #[error("Upstream request timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// Provider answered with something we cannot interpret.
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Connection, DNS or TLS failure talking to the provider.
    #[error("Upstream transport error: {0}")]
    Transport(String),

    /// Cache store failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl IntegrationError {
    /// Create an authorization denied error.
    #[must_use]
    pub fn denied(error: impl Into<String>, description: Option<String>) -> Self {
        Self::AuthorizationDenied {
            error: error.into(),
            description,
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an upstream API error.
    #[must_use]
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamApi {
            status,
            body: body.into(),
        }
    }

    /// Create an upstream protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::UpstreamProtocol(message.into())
    }

    /// True for any of the state verification failures.
    #[must_use]
    pub const fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedState | Self::StateMismatch | Self::StateExpiredOrMissing
        )
    }

    /// HTTP status this error maps to at the API boundary.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthorizationDenied { .. }
            | Self::MalformedState
            | Self::StateMismatch
            | Self::StateExpiredOrMissing
            | Self::InvalidRequest(_)
            | Self::InvalidCredentials(_)
            | Self::NoCredentials => StatusCode::BAD_REQUEST,
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::CorruptedCredentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamApi { .. } | Self::UpstreamProtocol(_) | Self::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns true if the caller is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to return to the front-end.
    ///
    /// State failures collapse into one message so a caller cannot tell a
    /// forged state from an expired one.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::AuthorizationDenied { error, description } => {
                description.clone().unwrap_or_else(|| error.clone())
            }
            e if e.is_state_error() => "State does not match.".to_string(),
            Self::NoCredentials => "No credentials found.".to_string(),
            Self::CorruptedCredentials(_) => "Corrupted credentials data.".to_string(),
            Self::UnknownProvider(_) => "Integration not supported".to_string(),
            Self::Cache(_) => "Cache unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type alias for integration operations.
pub type IntegrationResult<T> = Result<T, IntegrationError>;
