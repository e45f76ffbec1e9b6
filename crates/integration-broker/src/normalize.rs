//! Helpers for mapping raw provider payloads onto
//! [`IntegrationItem`](crate::models::IntegrationItem).
//!
//! Providers that bury display names in loosely shaped property bags are
//! searched with [`Node::find_key`], a depth-first walk over a closed set of
//! node kinds.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A loosely structured document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Keyed children, in source order.
    Mapping(Vec<(String, Node)>),
    /// Ordered children.
    Sequence(Vec<Node>),
    Scalar(Scalar),
}

impl Node {
    /// Depth-first search for `key`.
    ///
    /// In a mapping the key itself is checked before any value is descended
    /// into; values and sequence elements are visited in order. A key bound to
    /// null does not count as a match and the search carries on.
    #[must_use]
    pub fn find_key(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(entries) => {
                let direct = entries
                    .iter()
                    .find(|(k, v)| k == key && !v.is_null())
                    .map(|(_, v)| v);
                let nested = || entries.iter().find_map(|(_, v)| v.find_key(key));
                direct.or_else(nested)
            }
            Self::Sequence(items) => items.iter().find_map(|item| item.find_key(key)),
            Self::Scalar(_) => None,
        }
    }

    /// First match for `key` that is a text scalar.
    #[must_use]
    pub fn find_text(&self, key: &str) -> Option<&str> {
        self.find_key(key).and_then(Self::as_text)
    }

    /// Direct child of a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Self::Scalar(Scalar::Text(s.clone())),
            Value::Array(items) => Self::Sequence(items.iter().map(Self::from).collect()),
            Value::Object(map) => {
                let entries = map.iter().map(|(k, v)| (k.clone(), Self::from(v)));
                Self::Mapping(entries.collect())
            }
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

/// String field of a JSON object.
#[must_use]
pub fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// RFC 3339 timestamp field; unparseable values are treated as unknown.
#[must_use]
pub fn timestamp(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = value.get(key)?.as_str()?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(key, raw, error = %e, "Ignoring unparseable timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_key_direct_before_nested() {
        let node = Node::from(json!({
            "a": {"content": "nested"},
            "content": "direct"
        }));
        assert_eq!(node.find_text("content"), Some("direct"));
    }

    #[test]
    fn test_find_key_through_sequences() {
        let node = Node::from(json!({
            "title": {"type": "title", "title": [{"text": {"content": "Roadmap"}}]}
        }));
        assert_eq!(node.find_text("content"), Some("Roadmap"));
    }

    #[test]
    fn test_find_key_first_in_order() {
        let node = Node::from(json!([
            {"x": 1},
            {"content": "first"},
            {"content": "second"}
        ]));
        assert_eq!(node.find_text("content"), Some("first"));
    }

    #[test]
    fn test_find_key_follows_document_order() {
        let doc: Value = serde_json::from_str(
            r#"{"zeta": {"content": "first"}, "alpha": {"content": "second"}}"#,
        )
        .unwrap();
        assert_eq!(Node::from(&doc).find_text("content"), Some("first"));
    }

    #[test]
    fn test_find_key_skips_null() {
        let node = Node::from(json!({
            "a": {"content": null},
            "b": [{"content": "found"}]
        }));
        assert_eq!(node.find_text("content"), Some("found"));
    }

    #[test]
    fn test_find_key_absent() {
        let node = Node::from(json!({"a": [1, 2, {"b": "c"}], "d": true}));
        assert!(node.find_key("content").is_none());
        assert!(Node::from(json!("content")).find_key("content").is_none());
    }

    #[test]
    fn test_timestamp() {
        let v = json!({"t": "2024-01-02T03:04:05.000Z", "bad": "yesterday"});
        let ts = timestamp(&v, "t").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert!(timestamp(&v, "bad").is_none());
        assert!(timestamp(&v, "missing").is_none());
    }
}
