//! Fuzzing library for integration-broker.
//!
//! Targets cover the two places untrusted bytes enter the broker: the
//! `state` parameter of a provider callback, and provider listing payloads.
//!
//! # Usage
//!
//! ```bash
//! cd crates/broker-fuzz
//! cargo +nightly fuzz run fuzz_state_decode -- -max_total_time=60
//! ```

pub use integration_broker::{normalize, oauth, providers};
