//! OAuth 2.0 authorization-code client side.
//!
//! ## Pieces
//! - [`state`]: anti-CSRF state issue/decode/verify
//! - [`pkce`]: RFC 7636 S256 verifier/challenge pairs
//! - [`broker`]: one-shot state and credential storage
//! - [`flow`]: the provider-agnostic flow driver

pub mod broker;
pub mod flow;
pub mod pkce;
pub mod state;

pub use broker::{CacheKey, CredentialBroker, FlowKey, Purpose};
pub use flow::{CallbackParams, OAuthFlow};
pub use pkce::PkceVerifier;
pub use state::AuthorizationState;
