//! The authorization-code flow, shared by every provider.
//!
//! ```text
//! begin_authorization ──► state (+ verifier) cached ──► redirect URL
//! complete_authorization ──► verify state ──► token exchange ∥ delete state
//!                         ──► credentials cached
//! take_credentials ──► one-shot read
//! fetch_items ──► provider listing ──► normalized items
//! ```

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use super::broker::{CredentialBroker, FlowKey};
use super::pkce::PkceVerifier;
use super::state::AuthorizationState;
use crate::client::UpstreamClient;
use crate::config::Config;
use crate::error::{IntegrationError, IntegrationResult};
use crate::models::IntegrationItem;
use crate::providers::{ProviderDescriptor, ProviderId, TokenAuth, TokenBody};

/// Query parameters of a provider redirect back to us.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// One provider's flow: its descriptor plus the shared collaborators.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    descriptor: ProviderDescriptor,
    broker: CredentialBroker,
    client: UpstreamClient,
    state_ttl: Duration,
    credentials_ttl: Duration,
}

impl OAuthFlow {
    #[must_use]
    pub fn new(
        descriptor: ProviderDescriptor,
        broker: CredentialBroker,
        client: UpstreamClient,
        config: &Config,
    ) -> Self {
        Self {
            descriptor,
            broker,
            client,
            state_ttl: config.state_ttl,
            credentials_ttl: config.credentials_ttl,
        }
    }

    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.descriptor.id
    }

    fn key(&self, org_id: &str, user_id: &str) -> FlowKey {
        FlowKey::new(self.descriptor.id, org_id, user_id)
    }

    /// Start a flow and return the URL to send the user to.
    ///
    /// Any in-flight state for the same (provider, org, user) is replaced.
    pub async fn begin_authorization(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> IntegrationResult<String> {
        let key = self.key(org_id, user_id);
        let (opaque, state) = AuthorizationState::issue(user_id, org_id);
        let pkce = self.descriptor.pkce.then(PkceVerifier::generate);

        match pkce {
            Some(ref pkce) => {
                let (stored_state, stored_verifier) = tokio::join!(
                    self.broker.put_state(&key, &state, self.state_ttl),
                    self.broker.put_verifier(&key, pkce, self.state_ttl),
                );
                stored_state?;
                stored_verifier?;
            }
            None => self.broker.put_state(&key, &state, self.state_ttl).await?,
        }

        tracing::info!(
            provider = %key.provider,
            org_id,
            user_id,
            pkce = pkce.is_some(),
            "Authorization started"
        );
        Ok(self.descriptor.authorization_url(&opaque, pkce.as_ref()))
    }

    /// Handle the provider redirect: verify state, exchange the code, cache the
    /// token response.
    ///
    /// State and verifier entries are deleted whether or not the exchange
    /// succeeds. A callback missing `code` or `state` is an invalid request.
    pub async fn complete_authorization(&self, params: CallbackParams) -> IntegrationResult<()> {
        if let Some(error) = params.error {
            tracing::info!(
                provider = %self.descriptor.id,
                %error,
                "Provider reported authorization error"
            );
            return Err(IntegrationError::denied(error, params.error_description));
        }
        let code = params
            .code
            .ok_or_else(|| IntegrationError::invalid_request("missing code"))?;
        let opaque = params
            .state
            .ok_or_else(|| IntegrationError::invalid_request("missing state"))?;

        let decoded = AuthorizationState::decode(&opaque)?;
        let key = self.key(&decoded.org_id, &decoded.user_id);

        let (stored, verifier) = if self.descriptor.pkce {
            let (stored, verifier) = tokio::join!(
                self.broker.get_state(&key),
                self.broker.get_verifier(&key)
            );
            (stored?, verifier?)
        } else {
            (self.broker.get_state(&key).await?, None)
        };

        if let Err(e) = decoded.verify(stored.as_ref()) {
            tracing::warn!(
                provider = %key.provider,
                org_id = %key.org_id,
                user_id = %key.user_id,
                error = %e,
                "Rejected callback state"
            );
            return Err(e);
        }
        if self.descriptor.pkce && verifier.is_none() {
            tracing::warn!(
                provider = %key.provider,
                "State present but PKCE verifier missing"
            );
            return Err(IntegrationError::StateExpiredOrMissing);
        }

        let (exchanged, deleted_state, deleted_verifier) = tokio::join!(
            self.exchange_code(&code, verifier.as_ref()),
            self.broker.delete_state(&key),
            async {
                if self.descriptor.pkce {
                    self.broker.delete_verifier(&key).await
                } else {
                    Ok(())
                }
            },
        );
        deleted_state?;
        deleted_verifier?;
        let credentials = exchanged?;

        self.broker
            .put_credentials(&key, &credentials, self.credentials_ttl)
            .await?;
        tracing::info!(
            provider = %key.provider,
            org_id = %key.org_id,
            user_id = %key.user_id,
            "Authorization completed"
        );
        Ok(())
    }

    /// POST the authorization code to the token endpoint and return the raw response.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: Option<&PkceVerifier>,
    ) -> IntegrationResult<serde_json::Value> {
        let settings = &self.descriptor.settings;
        let mut fields: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", settings.redirect_uri.as_str()),
        ];
        match self.descriptor.token_auth {
            TokenAuth::Form => {
                fields.push(("client_id", settings.client_id.as_str()));
                fields.push(("client_secret", settings.client_secret.as_str()));
            }
            TokenAuth::Basic if verifier.is_some() => {
                fields.push(("client_id", settings.client_id.as_str()));
            }
            TokenAuth::Basic => {}
        }
        if let Some(verifier) = verifier {
            fields.push(("code_verifier", verifier.verifier()));
        }

        let mut request = self.client.post(self.descriptor.token_url.as_str());
        if self.descriptor.token_auth == TokenAuth::Basic {
            let pair = format!("{}:{}", settings.client_id, settings.client_secret);
            let pair = STANDARD.encode(pair);
            request = request.header(AUTHORIZATION, format!("Basic {pair}"));
        }
        let request = match self.descriptor.token_body {
            TokenBody::Form => UpstreamClient::form_body(request, &fields),
            TokenBody::Json => {
                let body: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), serde_json::Value::from(*v)))
                    .collect();
                UpstreamClient::json_body(request, &serde_json::Value::Object(body))?
            }
        };

        let credentials = self.client.send_json(request).await?;
        if !credentials.is_object() {
            return Err(IntegrationError::protocol(
                "token response is not a JSON object",
            ));
        }
        Ok(credentials)
    }

    /// Hand the cached credentials to the caller, exactly once.
    pub async fn take_credentials(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> IntegrationResult<serde_json::Value> {
        let key = self.key(org_id, user_id);
        let credentials = self.broker.take_credentials(&key).await?;
        tracing::info!(
            provider = %key.provider,
            org_id,
            user_id,
            "Credentials handed off"
        );
        Ok(credentials)
    }

    /// List the items visible to the given credential blob.
    pub async fn fetch_items(
        &self,
        credentials: &str,
    ) -> IntegrationResult<Vec<IntegrationItem>> {
        let parsed: serde_json::Value = serde_json::from_str(credentials).map_err(|e| {
            IntegrationError::InvalidCredentials(format!("not valid JSON: {e}"))
        })?;
        let access_token = parsed
            .get("access_token")
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                IntegrationError::InvalidCredentials("missing access_token".into())
            })?;

        let items = self
            .descriptor
            .fetch_items(&self.client, access_token)
            .await?;
        tracing::info!(
            provider = %self.descriptor.id,
            count = items.len(),
            "Fetched items"
        );
        Ok(items)
    }
}
