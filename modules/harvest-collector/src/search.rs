// Seam between the collector and the remote search capability.
//
// The collector only needs "give me one page for these bounds". SearchClient
// is the production implementation; tests use the mocks in `testing`.

use async_trait::async_trait;
use search_client::{SearchClient, SearchParams, Tweet};

#[async_trait]
pub trait PostSearch: Send + Sync {
    /// One page of posts matching `params`, newest first. Empty when the
    /// bounds hold nothing (more).
    async fn search_page(&self, params: &SearchParams) -> search_client::Result<Vec<Tweet>>;
}

#[async_trait]
impl PostSearch for SearchClient {
    async fn search_page(&self, params: &SearchParams) -> search_client::Result<Vec<Tweet>> {
        self.search_tweets(params).await
    }
}
