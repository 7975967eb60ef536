pub mod error;
pub mod types;

pub use error::{Result, SearchError};
pub use types::{SearchParams, SearchResponse, Tweet};

use std::time::Duration;

const BASE_URL: &str = "https://api.twitter.com/1.1";

/// Default per-request timeout. The harvester imposes no timeout of its own.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SearchClient {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(BASE_URL.to_string(), token, DEFAULT_TIMEOUT)
    }

    /// Build a client against a custom endpoint, e.g. a proxy or a local stub.
    pub fn with_base_url(base_url: String, token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetch one page of search results, newest first. An empty vec means the
    /// API has nothing (more) to return for these bounds.
    pub async fn search_tweets(&self, params: &SearchParams) -> Result<Vec<Tweet>> {
        let url = format!("{}/search/tweets.json", self.base_url);
        tracing::debug!(
            query = %params.query,
            since_id = ?params.since_id,
            max_id = ?params.max_id,
            count = params.count,
            "Requesting search page"
        );

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&params.to_query())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let page: SearchResponse = serde_json::from_str(&body)?;
        tracing::debug!(count = page.statuses.len(), "Search page received");

        Ok(page.statuses)
    }
}
