//! Configuration for the integration broker.

use std::time::Duration;

/// Endpoint and lifetime constants.
pub mod api {
    use std::time::Duration;

    /// Notion authorization endpoint.
    pub const NOTION_AUTH_URL: &str = "https://api.notion.com/v1/oauth/authorize";

    /// Notion token endpoint.
    pub const NOTION_TOKEN_URL: &str = "https://api.notion.com/v1/oauth/token";

    /// Notion REST API base.
    pub const NOTION_API: &str = "https://api.notion.com";

    /// Airtable authorization endpoint.
    pub const AIRTABLE_AUTH_URL: &str = "https://airtable.com/oauth2/v1/authorize";

    /// Airtable token endpoint.
    pub const AIRTABLE_TOKEN_URL: &str = "https://airtable.com/oauth2/v1/token";

    /// Airtable REST API base.
    pub const AIRTABLE_API: &str = "https://api.airtable.com";

    /// HubSpot authorization endpoint.
    pub const HUBSPOT_AUTH_URL: &str = "https://app.hubspot.com/oauth/authorize";

    /// HubSpot token endpoint.
    pub const HUBSPOT_TOKEN_URL: &str = "https://api.hubapi.com/oauth/v1/token";

    /// HubSpot REST API base.
    pub const HUBSPOT_API: &str = "https://api.hubapi.com";

    /// Lifetime of state, verifier and credential entries (10 minutes).
    pub const ENTRY_TTL: Duration = Duration::from_secs(600);

    /// Outbound request timeout. Kept short so a stalled provider cannot pin a request.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Front-end origin allowed by CORS.
    pub const FRONTEND_ORIGIN: &str = "http://localhost:3000";
}

/// OAuth client registration and endpoints for one provider.
#[derive(Clone)]
pub struct ProviderSettings {
    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Redirect URI registered with the provider.
    pub redirect_uri: String,

    /// Authorization endpoint (overridable for testing).
    pub auth_url: String,

    /// Token endpoint (overridable for testing).
    pub token_url: String,

    /// REST API base (overridable for testing).
    pub api_base: String,
}

impl ProviderSettings {
    /// Load settings for one provider from `{PREFIX}_CLIENT_ID`, `{PREFIX}_CLIENT_SECRET`
    /// and `{PREFIX}_REDIRECT_URI`.
    ///
    /// Returns `None` when the client id or secret is unset; the provider is then not served.
    fn from_env(prefix: &str, auth_url: &str, token_url: &str, api_base: &str) -> Option<Self> {
        let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
        let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
        let redirect_uri = std::env::var(format!("{prefix}_REDIRECT_URI")).unwrap_or_else(|_| {
            format!(
                "http://localhost:8000/integrations/{}/oauth2callback",
                prefix.to_ascii_lowercase()
            )
        });

        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: std::env::var(format!("{prefix}_AUTH_URL"))
                .unwrap_or_else(|_| auth_url.to_string()),
            token_url: token_url.to_string(),
            api_base: api_base.to_string(),
        })
    }

    fn for_testing(name: &str, base_url: &str) -> Self {
        Self {
            client_id: format!("{name}-client-id"),
            client_secret: format!("{name}-client-secret"),
            redirect_uri: format!("http://localhost:8000/integrations/{name}/oauth2callback"),
            auth_url: format!("{base_url}/{name}/authorize"),
            token_url: format!("{base_url}/{name}/token"),
            api_base: format!("{base_url}/{name}/api"),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .finish()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Notion OAuth settings (provider disabled when absent).
    pub notion: Option<ProviderSettings>,

    /// Airtable OAuth settings (provider disabled when absent).
    pub airtable: Option<ProviderSettings>,

    /// HubSpot OAuth settings (provider disabled when absent).
    pub hubspot: Option<ProviderSettings>,

    /// Redis URL; the in-memory cache is used when unset.
    pub redis_url: Option<String>,

    /// Lifetime of state and verifier entries.
    pub state_ttl: Duration,

    /// Lifetime of stored credentials.
    pub credentials_ttl: Duration,

    /// Outbound request timeout.
    pub request_timeout: Duration,

    /// Outbound connection timeout.
    pub connect_timeout: Duration,

    /// Origin allowed by CORS.
    pub frontend_origin: String,
}

impl Config {
    /// Create a configuration with no providers and default lifetimes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            notion: None,
            airtable: None,
            hubspot: None,
            redis_url: None,
            state_ttl: api::ENTRY_TTL,
            credentials_ttl: api::ENTRY_TTL,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            frontend_origin: api::FRONTEND_ORIGIN.to_string(),
        }
    }

    /// Create a test configuration with every provider pointed at a mock server.
    ///
    /// Provider endpoints live under `{base_url}/{provider}/authorize`, `/token` and `/api`.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            notion: Some(ProviderSettings::for_testing("notion", base_url)),
            airtable: Some(ProviderSettings::for_testing("airtable", base_url)),
            hubspot: Some(ProviderSettings::for_testing("hubspot", base_url)),
            request_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            ..Self::new()
        }
    }

    /// Create configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::new();
        Ok(Self {
            notion: ProviderSettings::from_env(
                "NOTION",
                api::NOTION_AUTH_URL,
                api::NOTION_TOKEN_URL,
                api::NOTION_API,
            ),
            airtable: ProviderSettings::from_env(
                "AIRTABLE",
                api::AIRTABLE_AUTH_URL,
                api::AIRTABLE_TOKEN_URL,
                api::AIRTABLE_API,
            ),
            hubspot: ProviderSettings::from_env(
                "HUBSPOT",
                api::HUBSPOT_AUTH_URL,
                api::HUBSPOT_TOKEN_URL,
                api::HUBSPOT_API,
            ),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            state_ttl: secs_from_env("STATE_TTL_SECS")?.unwrap_or(defaults.state_ttl),
            credentials_ttl: secs_from_env("CREDENTIALS_TTL_SECS")?
                .unwrap_or(defaults.credentials_ttl),
            request_timeout: secs_from_env("UPSTREAM_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout),
            frontend_origin: std::env::var("FRONTEND_ORIGIN")
                .unwrap_or(defaults.frontend_origin.clone()),
            ..defaults
        })
    }

    /// Names of the providers that have client credentials configured.
    #[must_use]
    pub fn configured_providers(&self) -> Vec<&'static str> {
        [
            ("notion", self.notion.is_some()),
            ("airtable", self.airtable.is_some()),
            ("hubspot", self.hubspot.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn secs_from_env(var: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(var) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{var} must be whole seconds: {e}"))?;
            anyhow::ensure!(secs > 0, "{var} must be at least 1 second");
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}
