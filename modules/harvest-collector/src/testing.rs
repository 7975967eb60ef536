// Test mocks for the collection pipeline.
//
// Two PostSearch mocks:
// - SimulatedSearch: an in-memory corpus answering since_id/max_id/count the
//   way the real endpoint does, with optional fault injection.
// - ScriptedSearch: returns a fixed sequence of responses, for pages that a
//   well-behaved API would never send.
//
// Both record every request so tests can assert on the paging bounds.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use search_client::{SearchError, SearchParams, Tweet};

use crate::search::PostSearch;

/// Build a post with the given id and text.
pub fn tweet(id: u64, text: &str) -> Tweet {
    Tweet {
        id,
        full_text: Some(text.to_string()),
        text: None,
        created_at: None,
        extra: Default::default(),
    }
}

// ---------------------------------------------------------------------------
// SimulatedSearch
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SimulatedSearch {
    posts: Mutex<BTreeMap<u64, Tweet>>,
    requests: Mutex<Vec<SearchParams>>,
    fail_on_call: Mutex<Option<usize>>,
}

impl SimulatedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        let search = Self::new();
        search.add_ids(ids);
        search
    }

    /// Publish more posts, as if they had been posted since the last run.
    pub fn add_ids(&self, ids: impl IntoIterator<Item = u64>) {
        let mut posts = self.posts.lock().unwrap();
        for id in ids {
            posts.insert(id, tweet(id, &format!("post {id}")));
        }
    }

    /// Make the n-th request from now (1-based) fail with a network error.
    pub fn fail_on_call(&self, n: usize) {
        let already = self.requests.lock().unwrap().len();
        *self.fail_on_call.lock().unwrap() = Some(already + n);
    }

    pub fn requests(&self) -> Vec<SearchParams> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostSearch for SimulatedSearch {
    async fn search_page(&self, params: &SearchParams) -> search_client::Result<Vec<Tweet>> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(params.clone());
            requests.len()
        };
        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return Err(SearchError::Network("simulated outage".into()));
        }

        let lower = params.since_id.map_or(0, |id| id.saturating_add(1));
        let upper = params.max_id.unwrap_or(u64::MAX);
        if lower > upper {
            return Ok(Vec::new());
        }
        let posts = self.posts.lock().unwrap();
        Ok(posts
            .range(lower..=upper)
            .rev()
            .take(params.count as usize)
            .map(|(_, t)| t.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedSearch
// ---------------------------------------------------------------------------

/// Replays canned responses in order; an empty page once the script runs out.
#[derive(Default)]
pub struct ScriptedSearch {
    responses: Mutex<VecDeque<search_client::Result<Vec<Tweet>>>>,
    requests: Mutex<Vec<SearchParams>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_page(self, ids: &[u64]) -> Self {
        let page = ids.iter().map(|&id| tweet(id, &format!("post {id}"))).collect();
        self.responses.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn then_error(self, error: SearchError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<SearchParams> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostSearch for ScriptedSearch {
    async fn search_page(&self, params: &SearchParams) -> search_client::Result<Vec<Tweet>> {
        self.requests.lock().unwrap().push(params.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
