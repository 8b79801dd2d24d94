use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ResolvedUrl, ResolverError, UrlResolver};

#[derive(Deserialize, Debug)]
struct ParserResponse {
    item: Option<ParserItem>,
}

#[derive(Deserialize, Debug)]
struct ParserItem {
    item_id: serde_json::Value,
    #[serde(default)]
    resolved_id: Option<serde_json::Value>,
    #[serde(default)]
    title: Option<String>,
}

/// Resolves URLs through the external parser service.
pub struct ParserClient {
    client: Client,
    endpoint: String,
}

impl ParserClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ResolverError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

// The parser reports ids either as JSON numbers or numeric strings.
fn parse_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn into_resolved(response: ParserResponse) -> Result<ResolvedUrl, ResolverError> {
    let item = response
        .item
        .ok_or_else(|| ResolverError::MalformedResponse("missing item".to_string()))?;
    let item_id = parse_id(&item.item_id)
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            ResolverError::MalformedResponse(format!("invalid item_id {}", item.item_id))
        })?;
    let resolved_id = item.resolved_id.as_ref().and_then(parse_id).filter(|id| *id > 0);
    Ok(ResolvedUrl {
        item_id,
        resolved_id,
        title: item.title.filter(|t| !t.is_empty()),
    })
}

#[async_trait]
impl UrlResolver for ParserClient {
    async fn resolve(&self, url: &str) -> Result<ResolvedUrl, ResolverError> {
        let response = self
            .client
            .get(format!("{}/getItemListApi", self.endpoint.trim_end_matches('/')))
            .query(&[("url", url), ("getItem", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::BadStatus(status.as_u16()));
        }

        let parsed: ParserResponse = response.json().await?;
        let resolved = into_resolved(parsed)?;
        debug!(item_id = resolved.item_id, "Resolved url through parser.");
        Ok(resolved)
    }
}
