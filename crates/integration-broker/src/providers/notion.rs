//! Notion: pages and databases shared with the integration.

use serde_json::{Value, json};

use super::{FlowShape, Pager, TokenAuth, TokenBody};
use crate::client::UpstreamClient;
use crate::error::IntegrationResult;
use crate::models::IntegrationItem;
use crate::normalize::{Node, text, timestamp};

/// Notion takes no scopes; access is chosen by the user on the consent page.
pub const SHAPE: FlowShape = FlowShape {
    scope: "",
    extra_auth_params: &[("response_type", "code"), ("owner", "user")],
    pkce: false,
    token_auth: TokenAuth::Basic,
    token_body: TokenBody::Json,
};

/// Pinned API version sent on every listing call.
pub const API_VERSION: &str = "2022-06-28";

const PAGE_SIZE: u32 = 100;

/// Fallback name when no text content is found anywhere in the object.
const UNNAMED: &str = "multi_select";

/// Search everything the token can see.
pub async fn fetch_items(
    client: &UpstreamClient,
    api_base: &str,
    access_token: &str,
) -> IntegrationResult<Vec<IntegrationItem>> {
    let url = format!("{api_base}/v1/search");
    let mut items = Vec::new();
    let mut pager = Pager::default();
    let mut cursor: Option<String> = None;

    loop {
        let mut body = json!({ "page_size": PAGE_SIZE });
        if let Some(ref cursor) = cursor {
            body["start_cursor"] = Value::from(cursor.as_str());
        }
        let request = UpstreamClient::bearer(client.post(&url), access_token)
            .header("Notion-Version", API_VERSION);
        let page = client
            .send_json(UpstreamClient::json_body(request, &body)?)
            .await?;

        if let Some(results) = page.get("results").and_then(Value::as_array) {
            items.extend(results.iter().map(normalize));
        }

        let has_more = page
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let next = if has_more {
            text(&page, "next_cursor")
        } else {
            None
        };
        match pager.advance(next)? {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(items)
}

/// Map one search result (page or database) onto an item.
#[must_use]
pub fn normalize(object: &Value) -> IntegrationItem {
    let object_type = text(object, "object").unwrap_or_default();
    let node = Node::from(object);

    let name = node
        .get("properties")
        .and_then(|props| props.find_text("content"))
        .or_else(|| node.find_text("content"))
        .unwrap_or(UNNAMED);

    let parent_id = object.get("parent").and_then(|parent| {
        let kind = parent.get("type").and_then(Value::as_str)?;
        if kind == "workspace" {
            None
        } else {
            text(parent, kind)
        }
    });

    IntegrationItem {
        id: text(object, "id"),
        name: Some(format!("{object_type} {name}")),
        item_type: Some(object_type),
        parent_id,
        url: text(object, "url"),
        creation_time: timestamp(object, "created_time"),
        last_modified_time: timestamp(object, "last_edited_time"),
        visibility: !object
            .get("archived")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        ..IntegrationItem::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page() {
        let page = json!({
            "object": "page",
            "id": "p1",
            "url": "https://www.notion.so/p1",
            "created_time": "2024-03-01T10:00:00.000Z",
            "last_edited_time": "2024-03-02T10:00:00.000Z",
            "archived": false,
            "parent": {"type": "page_id", "page_id": "root"},
            "properties": {
                "title": {"id": "title", "type": "title", "title": [
                    {"type": "text", "text": {"content": "Roadmap"}, "plain_text": "Roadmap"}
                ]}
            }
        });
        let item = normalize(&page);

        assert_eq!(item.id.as_deref(), Some("p1"));
        assert_eq!(item.item_type.as_deref(), Some("page"));
        assert_eq!(item.name.as_deref(), Some("page Roadmap"));
        assert_eq!(item.parent_id.as_deref(), Some("root"));
        assert!(item.visibility);
        assert!(item.creation_time.is_some());
    }

    #[test]
    fn test_workspace_parent_has_no_id() {
        let db = json!({
            "object": "database",
            "id": "d1",
            "parent": {"type": "workspace", "workspace": true},
            "title": [{"text": {"content": "Tasks"}}],
            "properties": {"Status": {"type": "select", "select": {}}},
            "archived": true
        });
        let item = normalize(&db);

        assert_eq!(item.parent_id, None);
        assert_eq!(item.name.as_deref(), Some("database Tasks"));
        assert!(!item.visibility);
    }

    #[test]
    fn test_unnamed_object() {
        let page = json!({
            "object": "page",
            "id": "p2",
            "parent": {"type": "database_id", "database_id": "d1"},
            "properties": {"Tags": {"type": "multi_select", "multi_select": []}}
        });
        let item = normalize(&page);

        assert_eq!(item.name.as_deref(), Some("page multi_select"));
        assert_eq!(item.parent_id.as_deref(), Some("d1"));
    }

    #[test]
    fn test_name_follows_property_order() {
        // parsed from text so the property order is the one the API sent
        let page: Value = serde_json::from_str(
            r#"{
                "object": "page",
                "id": "p3",
                "parent": {"type": "workspace", "workspace": true},
                "properties": {
                    "Name": {"title": [{"text": {"content": "Roadmap"}}]},
                    "Alias": {"rich_text": [{"text": {"content": "zzz-alias"}}]}
                }
            }"#,
        )
        .unwrap();
        let item = normalize(&page);

        assert_eq!(item.name.as_deref(), Some("page Roadmap"));
    }
}
