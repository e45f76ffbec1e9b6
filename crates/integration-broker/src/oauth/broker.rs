//! Credential broker: the only code that touches the ephemeral cache.
//!
//! Entries are namespaced per (purpose, provider, org, user). A new
//! authorization overwrites the in-flight entries of the same tuple.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::pkce::PkceVerifier;
use super::state::AuthorizationState;
use crate::cache::EphemeralCache;
use crate::error::{CacheError, IntegrationError, IntegrationResult};
use crate::providers::ProviderId;

/// What a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    State,
    Verifier,
    Credentials,
}

impl Purpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Verifier => "verifier",
            Self::Credentials => "credentials",
        }
    }
}

/// The (provider, org, user) tuple a flow belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub provider: ProviderId,
    pub org_id: String,
    pub user_id: String,
}

impl FlowKey {
    #[must_use]
    pub fn new(
        provider: ProviderId,
        org_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            org_id: org_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Cache key for one purpose of this tuple.
    #[must_use]
    pub fn cache_key(&self, purpose: Purpose) -> CacheKey<'_> {
        CacheKey { purpose, key: self }
    }
}

/// Rendered as `{provider}_{purpose}:{org_id}:{user_id}`.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    purpose: Purpose,
    key: &'a FlowKey,
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}:{}:{}",
            self.key.provider,
            self.purpose.as_str(),
            self.key.org_id,
            self.key.user_id
        )
    }
}

/// Mediates between the OAuth flow and the cache.
#[derive(Clone)]
pub struct CredentialBroker {
    cache: Arc<dyn EphemeralCache>,
}

impl CredentialBroker {
    #[must_use]
    pub fn new(cache: Arc<dyn EphemeralCache>) -> Self {
        Self { cache }
    }

    /// Name of the cache backend in use.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub async fn put_state(
        &self,
        key: &FlowKey,
        state: &AuthorizationState,
        ttl: Duration,
    ) -> IntegrationResult<()> {
        let k = key.cache_key(Purpose::State).to_string();
        self.cache.set(&k, state.to_json(), ttl).await?;
        Ok(())
    }

    /// Stored state for the tuple, if any.
    ///
    /// A stored value that does not parse is reported as [`IntegrationError::MalformedState`].
    pub async fn get_state(&self, key: &FlowKey) -> IntegrationResult<Option<AuthorizationState>> {
        let k = key.cache_key(Purpose::State).to_string();
        self.cache
            .get(&k)
            .await?
            .map(|bytes| AuthorizationState::from_json(&bytes))
            .transpose()
    }

    pub async fn delete_state(&self, key: &FlowKey) -> IntegrationResult<()> {
        let k = key.cache_key(Purpose::State).to_string();
        self.cache.delete(&k).await?;
        Ok(())
    }

    pub async fn put_verifier(
        &self,
        key: &FlowKey,
        pkce: &PkceVerifier,
        ttl: Duration,
    ) -> IntegrationResult<()> {
        let k = key.cache_key(Purpose::Verifier).to_string();
        let value = pkce.verifier().as_bytes().to_vec();
        self.cache.set(&k, value, ttl).await?;
        Ok(())
    }

    pub async fn get_verifier(&self, key: &FlowKey) -> IntegrationResult<Option<PkceVerifier>> {
        let k = key.cache_key(Purpose::Verifier).to_string();
        let Some(bytes) = self.cache.get(&k).await? else {
            return Ok(None);
        };
        let verifier = String::from_utf8(bytes)
            .map_err(|_| IntegrationError::MalformedState)?;
        Ok(Some(PkceVerifier::from_verifier(verifier)))
    }

    pub async fn delete_verifier(&self, key: &FlowKey) -> IntegrationResult<()> {
        let k = key.cache_key(Purpose::Verifier).to_string();
        self.cache.delete(&k).await?;
        Ok(())
    }

    /// Store the raw token response for later pickup.
    pub async fn put_credentials(
        &self,
        key: &FlowKey,
        credentials: &serde_json::Value,
        ttl: Duration,
    ) -> IntegrationResult<()> {
        let k = key.cache_key(Purpose::Credentials).to_string();
        let bytes = serde_json::to_vec(credentials).map_err(CacheError::from)?;
        self.cache.set(&k, bytes, ttl).await?;
        Ok(())
    }

    /// Read and delete the stored credentials in one step.
    ///
    /// Never stored, already taken and expired all look the same to the caller.
    pub async fn take_credentials(&self, key: &FlowKey) -> IntegrationResult<serde_json::Value> {
        let k = key.cache_key(Purpose::Credentials).to_string();
        let Some(bytes) = self.cache.take(&k).await? else {
            return Err(IntegrationError::NoCredentials);
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(
                provider = %key.provider,
                error = %e,
                "Stored credentials are not valid JSON"
            );
            IntegrationError::CorruptedCredentials(e.to_string())
        })
    }
}

impl fmt::Debug for CredentialBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBroker")
            .field("backend", &self.cache.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    const TTL: Duration = Duration::from_secs(60);

    fn broker() -> (CredentialBroker, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        (CredentialBroker::new(cache.clone()), cache)
    }

    #[test]
    fn test_cache_key_format() {
        let key = FlowKey::new(ProviderId::Hubspot, "o1", "u1");
        for (purpose, expected) in [
            (Purpose::State, "hubspot_state:o1:u1"),
            (Purpose::Verifier, "hubspot_verifier:o1:u1"),
            (Purpose::Credentials, "hubspot_credentials:o1:u1"),
        ] {
            assert_eq!(key.cache_key(purpose).to_string(), expected);
        }
    }

    #[tokio::test]
    async fn test_state_lifecycle() {
        let (broker, _) = broker();
        let key = FlowKey::new(ProviderId::Notion, "o1", "u1");
        let (_, state) = AuthorizationState::issue("u1", "o1");

        broker.put_state(&key, &state, TTL).await.unwrap();
        assert_eq!(broker.get_state(&key).await.unwrap(), Some(state));

        broker.delete_state(&key).await.unwrap();
        assert_eq!(broker.get_state(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_verifier_lifecycle() {
        let (broker, _) = broker();
        let key = FlowKey::new(ProviderId::Airtable, "o1", "u1");
        let pkce = PkceVerifier::generate();

        broker.put_verifier(&key, &pkce, TTL).await.unwrap();
        assert_eq!(broker.get_verifier(&key).await.unwrap(), Some(pkce));

        broker.delete_verifier(&key).await.unwrap();
        assert!(broker.get_verifier(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_take_credentials_one_shot() {
        let (broker, _) = broker();
        let key = FlowKey::new(ProviderId::Hubspot, "o1", "u1");
        let creds = serde_json::json!({"access_token": "tok", "expires_in": 1800});

        broker.put_credentials(&key, &creds, TTL).await.unwrap();
        assert_eq!(broker.take_credentials(&key).await.unwrap(), creds);
        assert!(matches!(
            broker.take_credentials(&key).await,
            Err(IntegrationError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn test_take_credentials_corrupted() {
        let (broker, cache) = broker();
        let key = FlowKey::new(ProviderId::Notion, "o1", "u1");
        cache
            .set("notion_credentials:o1:u1", b"{not json".to_vec(), TTL)
            .await
            .unwrap();

        assert!(matches!(
            broker.take_credentials(&key).await,
            Err(IntegrationError::CorruptedCredentials(_))
        ));
    }

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let (broker, _) = broker();
        let notion = FlowKey::new(ProviderId::Notion, "o1", "u1");
        let hubspot = FlowKey::new(ProviderId::Hubspot, "o1", "u1");

        let blob = serde_json::json!({"p": "notion"});
        broker.put_credentials(&notion, &blob, TTL).await.unwrap();
        assert!(matches!(
            broker.take_credentials(&hubspot).await,
            Err(IntegrationError::NoCredentials)
        ));
        assert!(broker.take_credentials(&notion).await.is_ok());
    }
}
