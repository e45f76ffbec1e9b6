//! Anti-CSRF state tokens.
//!
//! The opaque `state` round-tripped through the provider is the base64url
//! encoding of `{"state": nonce, "user_id": .., "org_id": ..}`. It carries no
//! signature: a callback is trusted only if its nonce equals the copy stored
//! server-side under the (provider, org, user) key.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, IntegrationResult};

/// Random bytes per nonce (256 bits).
pub const NONCE_BYTES: usize = 32;

/// Decoder that accepts state with or without `=` padding.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// State issued at the start of an authorization flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
    /// Random nonce, base64url without padding.
    #[serde(rename = "state")]
    pub nonce: String,

    /// Caller's user identifier.
    pub user_id: String,

    /// Caller's organization identifier.
    pub org_id: String,
}

impl AuthorizationState {
    /// Issue a fresh state for a user.
    ///
    /// Returns the opaque transport form alongside the value to persist.
    #[must_use]
    pub fn issue(user_id: &str, org_id: &str) -> (String, Self) {
        let state = Self {
            nonce: random_token(NONCE_BYTES),
            user_id: user_id.to_owned(),
            org_id: org_id.to_owned(),
        };
        (state.encode(), state)
    }

    /// Opaque, URL-safe transport form.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.to_json())
    }

    /// JSON form as stored in the cache.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        // Three string fields cannot fail to serialize
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Parse the stored JSON form.
    pub fn from_json(bytes: &[u8]) -> IntegrationResult<Self> {
        serde_json::from_slice(bytes).map_err(|_| IntegrationError::MalformedState)
    }

    /// Decode an opaque state received on the callback.
    pub fn decode(opaque: &str) -> IntegrationResult<Self> {
        let bytes = LENIENT_URL_SAFE
            .decode(opaque.trim())
            .map_err(|_| IntegrationError::MalformedState)?;
        Self::from_json(&bytes)
    }

    /// Check a decoded callback state against the stored copy.
    ///
    /// `stored` is `None` when nothing is cached for the tuple (never issued,
    /// expired, or already consumed).
    pub fn verify(&self, stored: Option<&Self>) -> IntegrationResult<()> {
        let stored = stored.ok_or(IntegrationError::StateExpiredOrMissing)?;
        if constant_time_eq(self.nonce.as_bytes(), stored.nonce.as_bytes()) {
            Ok(())
        } else {
            Err(IntegrationError::StateMismatch)
        }
    }
}

/// `n` bytes of OS randomness, base64url without padding.
#[must_use]
pub fn random_token(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Equality whose running time does not depend on where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
