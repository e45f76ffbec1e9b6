//! Data models returned to front-end callers.
//!
//! Field names are snake_case on the wire and every field except the flags is optional.

mod item;

pub use item::IntegrationItem;
