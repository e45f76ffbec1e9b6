//! PKCE (Proof Key for Code Exchange) verifier generation.
//!
//! Implements the S256 method of RFC 7636. The plain method is not supported.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use super::state::random_token;

/// The only challenge method we send.
pub const METHOD: &str = "S256";

/// Random bytes behind a verifier: 64 bytes encode to 86 characters, inside the 43..=128 window.
const VERIFIER_BYTES: usize = 64;

/// A verifier and its derived challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceVerifier {
    verifier: String,
    challenge: String,
}

impl PkceVerifier {
    /// Generate a fresh random verifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(random_token(VERIFIER_BYTES))
    }

    /// Rebuild from a stored verifier string.
    #[must_use]
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// The secret sent to the token endpoint.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// The value sent to the authorization endpoint.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Compute `BASE64URL(SHA256(code_verifier))` without padding.
#[must_use]
pub fn challenge_for(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Verify a PKCE S256 code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` and compares to the stored challenge.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    challenge_for(code_verifier) == code_challenge
}
