//! URL resolution capability used by the upsert path.

use async_trait::async_trait;
use thiserror::Error;

pub mod parser_client;

pub use parser_client::ParserClient;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Resolver returned non-success status: {0}")]
    BadStatus(u16),
    #[error("Malformed resolver response: {0}")]
    MalformedResponse(String),
}

/// Canonical identity of a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub item_id: i64,
    pub resolved_id: Option<i64>,
    pub title: Option<String>,
}

#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedUrl, ResolverError>;
}
