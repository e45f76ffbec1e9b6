//! Third-party providers.
//!
//! A provider is data: a [`ProviderDescriptor`] naming its endpoints, scope
//! and token-exchange shape. The authorization flow itself is shared
//! ([`OAuthFlow`]); only resource listing is provider specific and lives in
//! the submodules.

pub mod airtable;
pub mod hubspot;
pub mod notion;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::client::UpstreamClient;
use crate::config::{Config, ProviderSettings};
use crate::error::{IntegrationError, IntegrationResult};
use crate::models::IntegrationItem;
use crate::oauth::{CredentialBroker, OAuthFlow, PkceVerifier, pkce};

/// Upper bound on pages fetched from one listing.
pub const MAX_PAGES: usize = 1000;

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Notion,
    Airtable,
    Hubspot,
}

impl ProviderId {
    /// All providers, in registration order.
    pub const ALL: [Self; 3] = [Self::Notion, Self::Airtable, Self::Hubspot];

    /// Path and cache-key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notion => "notion",
            Self::Airtable => "airtable",
            Self::Hubspot => "hubspot",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| IntegrationError::UnknownProvider(s.to_owned()))
    }
}

/// How the client authenticates at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAuth {
    /// `Authorization: Basic base64(client_id:client_secret)`.
    Basic,
    /// `client_id` and `client_secret` in the request body.
    Form,
}

/// Encoding of the token request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBody {
    Form,
    Json,
}

/// Fixed per-provider configuration consumed by the shared flow.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub settings: ProviderSettings,
    pub auth_url: Url,
    pub token_url: Url,
    pub api_base: String,
    /// Space-separated scopes; empty when the provider takes none.
    pub scope: &'static str,
    /// Query parameters the provider requires on its authorization URL.
    pub extra_auth_params: &'static [(&'static str, &'static str)],
    pub pkce: bool,
    pub token_auth: TokenAuth,
    pub token_body: TokenBody,
}

impl ProviderDescriptor {
    /// Descriptor for `id` with the given client registration.
    ///
    /// # Errors
    ///
    /// Returns error if a configured endpoint is not a valid URL.
    pub fn new(id: ProviderId, settings: ProviderSettings) -> anyhow::Result<Self> {
        let auth_url = Url::parse(&settings.auth_url)
            .map_err(|e| anyhow::anyhow!("{id}: invalid authorization URL: {e}"))?;
        let token_url = Url::parse(&settings.token_url)
            .map_err(|e| anyhow::anyhow!("{id}: invalid token URL: {e}"))?;
        let api_base = settings.api_base.trim_end_matches('/').to_owned();

        let shape = match id {
            ProviderId::Notion => notion::SHAPE,
            ProviderId::Airtable => airtable::SHAPE,
            ProviderId::Hubspot => hubspot::SHAPE,
        };

        Ok(Self {
            id,
            settings,
            auth_url,
            token_url,
            api_base,
            scope: shape.scope,
            extra_auth_params: shape.extra_auth_params,
            pkce: shape.pkce,
            token_auth: shape.token_auth,
            token_body: shape.token_body,
        })
    }

    /// Authorization URL the user is sent to.
    ///
    /// Existing query parameters on the configured endpoint are kept.
    #[must_use]
    pub fn authorization_url(&self, state: &str, pkce: Option<&PkceVerifier>) -> String {
        let mut url = self.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", &self.settings.redirect_uri);
            for (k, v) in self.extra_auth_params {
                query.append_pair(k, v);
            }
            if !self.scope.is_empty() {
                query.append_pair("scope", self.scope);
            }
            query.append_pair("state", state);
            if let Some(pkce) = pkce {
                query
                    .append_pair("code_challenge", pkce.challenge())
                    .append_pair("code_challenge_method", pkce::METHOD);
            }
        }
        url.into()
    }

    /// List and normalize the items visible to `access_token`.
    pub async fn fetch_items(
        &self,
        client: &UpstreamClient,
        access_token: &str,
    ) -> IntegrationResult<Vec<IntegrationItem>> {
        let api_base = self.api_base.as_str();
        match self.id {
            ProviderId::Notion => notion::fetch_items(client, api_base, access_token).await,
            ProviderId::Airtable => airtable::fetch_items(client, api_base, access_token).await,
            ProviderId::Hubspot => hubspot::fetch_items(client, api_base, access_token).await,
        }
    }
}

/// Static part of a descriptor, declared by each provider module.
#[derive(Debug, Clone, Copy)]
pub struct FlowShape {
    pub scope: &'static str,
    pub extra_auth_params: &'static [(&'static str, &'static str)],
    pub pkce: bool,
    pub token_auth: TokenAuth,
    pub token_body: TokenBody,
}

/// Providers served by this process, keyed by path name.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    flows: HashMap<ProviderId, OAuthFlow>,
}

impl ProviderRegistry {
    /// Register every provider that has client credentials configured.
    ///
    /// # Errors
    ///
    /// Returns error if a provider's endpoints are invalid.
    pub fn new(
        config: &Config,
        broker: CredentialBroker,
        client: UpstreamClient,
    ) -> anyhow::Result<Self> {
        let mut flows = HashMap::new();
        for id in ProviderId::ALL {
            let settings = match id {
                ProviderId::Notion => config.notion.clone(),
                ProviderId::Airtable => config.airtable.clone(),
                ProviderId::Hubspot => config.hubspot.clone(),
            };
            let Some(settings) = settings else {
                tracing::info!(provider = %id, "Provider not configured, skipping");
                continue;
            };
            let descriptor = ProviderDescriptor::new(id, settings)?;
            let flow = OAuthFlow::new(descriptor, broker.clone(), client.clone(), config);
            flows.insert(id, flow);
        }
        Ok(Self { flows })
    }

    /// Look up a provider by path name.
    ///
    /// Unknown and unconfigured providers are both reported as
    /// [`IntegrationError::UnknownProvider`].
    pub fn get(&self, name: &str) -> IntegrationResult<&OAuthFlow> {
        let id: ProviderId = name.parse()?;
        self.flows
            .get(&id)
            .ok_or_else(|| IntegrationError::UnknownProvider(name.to_owned()))
    }

    /// Registered providers, in registration order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.flows.contains_key(id))
            .collect()
    }
}

/// Guards cursor-based pagination against providers that loop.
#[derive(Debug, Default)]
pub(crate) struct Pager {
    seen: HashSet<String>,
    pages: usize,
}

impl Pager {
    /// Record a fetched page and decide whether to continue.
    ///
    /// Returns the next cursor, `None` when the listing is exhausted, or an
    /// error if the cursor was already used or the page cap is reached.
    pub(crate) fn advance(&mut self, next: Option<String>) -> IntegrationResult<Option<String>> {
        self.pages += 1;
        let Some(cursor) = next.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        if self.pages >= MAX_PAGES {
            return Err(IntegrationError::protocol(format!(
                "listing exceeded {MAX_PAGES} pages"
            )));
        }
        if !self.seen.insert(cursor.clone()) {
            return Err(IntegrationError::protocol(format!(
                "provider repeated cursor {cursor:?}"
            )));
        }
        Ok(Some(cursor))
    }
}
