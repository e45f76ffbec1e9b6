#![no_main]

use integration_broker::normalize::Node;
use integration_broker::providers::{airtable, hubspot, notion};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        let node = Node::from(&json);
        let _ = node.find_key("content");
        let _ = notion::normalize(&json);
        let _ = airtable::normalize_base(&json);
        let _ = airtable::normalize_table(&json, "base", None);
        let _ = hubspot::normalize(&json);
    }
});
