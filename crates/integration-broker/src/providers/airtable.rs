//! Airtable: bases and their tables.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use url::Url;

use super::{FlowShape, Pager, TokenAuth, TokenBody};
use crate::client::UpstreamClient;
use crate::error::{IntegrationError, IntegrationResult};
use crate::models::IntegrationItem;
use crate::normalize::text;

pub const SHAPE: FlowShape = FlowShape {
    scope: "data.records:read data.records:write data.recordComments:read \
            data.recordComments:write schema.bases:read schema.bases:write",
    extra_auth_params: &[("response_type", "code")],
    pkce: true,
    token_auth: TokenAuth::Basic,
    token_body: TokenBody::Form,
};

/// Table listings in flight at once.
pub const TABLE_FETCH_CONCURRENCY: usize = 4;

/// List every base, then every table of every base.
///
/// Items come out base first, followed by that base's tables.
pub async fn fetch_items(
    client: &UpstreamClient,
    api_base: &str,
    access_token: &str,
) -> IntegrationResult<Vec<IntegrationItem>> {
    let bases = list_bases(client, api_base, access_token).await?;

    let listings: Vec<_> = bases
        .iter()
        .map(|base| list_tables(client, api_base, access_token, base))
        .collect();
    let tables: Vec<Vec<IntegrationItem>> = stream::iter(listings)
        .buffered(TABLE_FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    let table_count: usize = tables.iter().map(Vec::len).sum();
    let mut items = Vec::with_capacity(bases.len() + table_count);
    for (base, tables) in bases.iter().zip(tables) {
        items.push(normalize_base(base));
        items.extend(tables);
    }
    Ok(items)
}

async fn list_bases(
    client: &UpstreamClient,
    api_base: &str,
    access_token: &str,
) -> IntegrationResult<Vec<Value>> {
    let endpoint = format!("{api_base}/v0/meta/bases");
    let mut bases = Vec::new();
    let mut pager = Pager::default();
    let mut offset: Option<String> = None;

    loop {
        let mut url = Url::parse(&endpoint).map_err(|e| {
            IntegrationError::protocol(format!("invalid listing URL {endpoint}: {e}"))
        })?;
        if let Some(ref offset) = offset {
            url.query_pairs_mut().append_pair("offset", offset);
        }
        let request = UpstreamClient::bearer(client.get(url.as_str()), access_token);
        let page = client.send_json(request).await?;

        if let Some(found) = page.get("bases").and_then(Value::as_array) {
            bases.extend(found.iter().cloned());
        }
        match pager.advance(text(&page, "offset"))? {
            Some(next) => offset = Some(next),
            None => break,
        }
    }

    Ok(bases)
}

async fn list_tables(
    client: &UpstreamClient,
    api_base: &str,
    access_token: &str,
    base: &Value,
) -> IntegrationResult<Vec<IntegrationItem>> {
    let Some(base_id) = base.get("id").and_then(Value::as_str) else {
        return Ok(Vec::new());
    };
    let url = format!("{api_base}/v0/meta/bases/{base_id}/tables");
    let request = UpstreamClient::bearer(client.get(&url), access_token);
    let response = client.send_json(request).await?;

    let base_name = text(base, "name");
    let base_name = base_name.as_deref();
    Ok(response
        .get("tables")
        .and_then(Value::as_array)
        .map(|tables| {
            tables
                .iter()
                .map(|table| normalize_table(table, base_id, base_name))
                .collect()
        })
        .unwrap_or_default())
}

#[must_use]
pub fn normalize_base(base: &Value) -> IntegrationItem {
    IntegrationItem {
        id: Some(format!("{}_Base", text(base, "id").unwrap_or_default())),
        item_type: Some("Base".into()),
        name: text(base, "name"),
        directory: true,
        ..IntegrationItem::default()
    }
}

#[must_use]
pub fn normalize_table(table: &Value, base_id: &str, base_name: Option<&str>) -> IntegrationItem {
    IntegrationItem {
        id: Some(format!("{}_Table", text(table, "id").unwrap_or_default())),
        item_type: Some("Table".into()),
        name: text(table, "name"),
        parent_id: Some(format!("{base_id}_Base")),
        parent_path_or_name: base_name.map(str::to_owned),
        ..IntegrationItem::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base() {
        let base = json!({"id": "app1", "name": "CRM", "permissionLevel": "create"});
        let item = normalize_base(&base);
        assert_eq!(item.id.as_deref(), Some("app1_Base"));
        assert_eq!(item.item_type.as_deref(), Some("Base"));
        assert_eq!(item.name.as_deref(), Some("CRM"));
        assert!(item.directory);
        assert_eq!(item.parent_id, None);
    }

    #[test]
    fn test_normalize_table() {
        let table = json!({"id": "tbl1", "name": "Leads"});
        let item = normalize_table(&table, "app1", Some("CRM"));
        assert_eq!(item.id.as_deref(), Some("tbl1_Table"));
        assert_eq!(item.item_type.as_deref(), Some("Table"));
        assert_eq!(item.parent_id.as_deref(), Some("app1_Base"));
        assert_eq!(item.parent_path_or_name.as_deref(), Some("CRM"));
        assert!(!item.directory);
    }

    #[test]
    fn test_scope_is_space_separated() {
        let scopes: Vec<_> = SHAPE.scope.split(' ').collect();
        assert_eq!(scopes.len(), 6);
        assert!(scopes.contains(&"schema.bases:read"));
        assert!(scopes.iter().all(|s| !s.is_empty()));
    }
}
