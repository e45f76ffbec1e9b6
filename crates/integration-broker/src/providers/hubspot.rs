//! HubSpot: CRM companies.

use serde_json::Value;
use url::Url;

use super::{FlowShape, Pager, TokenAuth, TokenBody};
use crate::client::UpstreamClient;
use crate::error::{IntegrationError, IntegrationResult};
use crate::models::IntegrationItem;
use crate::normalize::{text, timestamp};

pub const SHAPE: FlowShape = FlowShape {
    scope: "oauth crm.objects.companies.read",
    extra_auth_params: &[],
    pkce: false,
    token_auth: TokenAuth::Form,
    token_body: TokenBody::Form,
};

const PAGE_SIZE: &str = "100";

pub async fn fetch_items(
    client: &UpstreamClient,
    api_base: &str,
    access_token: &str,
) -> IntegrationResult<Vec<IntegrationItem>> {
    let endpoint = format!("{api_base}/crm/v3/objects/companies");
    let mut items = Vec::new();
    let mut pager = Pager::default();
    let mut after: Option<String> = None;

    loop {
        let mut url = Url::parse(&endpoint).map_err(|e| {
            IntegrationError::protocol(format!("invalid listing URL {endpoint}: {e}"))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", PAGE_SIZE);
            if let Some(ref after) = after {
                query.append_pair("after", after);
            }
        }
        let request = UpstreamClient::bearer(client.get(url.as_str()), access_token);
        let page = client.send_json(request).await?;

        if let Some(results) = page.get("results").and_then(Value::as_array) {
            items.extend(results.iter().map(normalize));
        }

        let next = page.pointer("/paging/next/after").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        match pager.advance(next)? {
            Some(next) => after = Some(next),
            None => break,
        }
    }

    Ok(items)
}

#[must_use]
pub fn normalize(company: &Value) -> IntegrationItem {
    IntegrationItem {
        id: text(company, "id"),
        item_type: Some("Company".into()),
        name: company.get("properties").and_then(|p| text(p, "name")),
        creation_time: timestamp(company, "createdAt"),
        last_modified_time: timestamp(company, "updatedAt"),
        url: text(company, "url"),
        visibility: !company
            .get("archived")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        ..IntegrationItem::default()
    }
}
