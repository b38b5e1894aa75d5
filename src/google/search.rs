use crate::{cache::Client, error::Result};
use serde::Deserialize;
use tracing::trace;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SearchItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ErrorDetail {
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SearchError {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub errors: Vec<ErrorDetail>,
}

impl SearchError {
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("Unknown error")
    }

    pub fn is_invalid_key(&self) -> bool {
        self.message().contains("API key not valid")
    }

    /// Quota and rate limit errors are worth retrying after a while
    pub fn is_quota(&self) -> bool {
        let reason_matches = |s: &str| {
            s.contains("quotaExceeded")
                || s.contains("rateLimitExceeded")
                || s.contains("Quota exceeded")
        };
        self.code == Some(429)
            || reason_matches(self.message())
            || self
                .errors
                .iter()
                .any(|e| e.reason.as_deref().is_some_and(reason_matches))
    }
}

/// Either `items` or `error` is set. Neither means no hits.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub error: Option<SearchError>,
}

#[derive(Clone)]
pub struct CustomSearchClient {
    client: Client,
    url: String,
    key: String,
    engine_id: String,
}

impl CustomSearchClient {
    pub fn new(client: Client, url: &str, key: &str, engine_id: &str) -> Self {
        Self {
            client,
            url: url.into(),
            key: key.into(),
            engine_id: engine_id.into(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        trace!(query, "Running custom search...");
        self.client
            .get_json(
                self.url.as_str(),
                &[
                    ("q", query),
                    ("key", self.key.as_str()),
                    ("cx", self.engine_id.as_str()),
                ],
            )
            .await
    }
}
