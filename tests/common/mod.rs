//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use e621_feed::models::{MediaExtension, Post, PostTags, Rating, Score};
use e621_feed::source::{FetchError, PostSource};

pub fn post(id: u64) -> Post {
    Post {
        id,
        media_url: format!("https://static.example/{id}.jpg"),
        media_extension: MediaExtension::Jpg,
        preview_url: None,
        tags: PostTags::default(),
        score: Score::default(),
        fav_count: 0,
        comment_count: 0,
        created_at: None,
        rating: Rating::Safe,
        description: String::new(),
        uploader_id: None,
        uploader_name: "Anonymous".to_string(),
    }
}

pub fn posts(ids: &[u64]) -> Vec<Post> {
    ids.iter().copied().map(post).collect()
}

pub fn ids(posts: &[Post]) -> Vec<u64> {
    posts.iter().map(|p| p.id).collect()
}

pub fn transport_error() -> FetchError {
    FetchError::Transport {
        status: Some(503),
        message: "service unavailable".to_string(),
    }
}

type Key = (String, u32);

#[derive(Default)]
struct Inner {
    responses: HashMap<Key, VecDeque<Result<Vec<Post>, FetchError>>>,
    gates: HashMap<Key, Arc<Semaphore>>,
    calls: Vec<Key>,
}

/// A [`PostSource`] answering from a script of queued responses per
/// `(tags, page)`. Unscripted requests return an empty page.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `(tags, page)`.
    pub fn respond(&self, tags: &str, page: u32, result: Result<Vec<Post>, FetchError>) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .responses
            .entry((tags.to_string(), page))
            .or_default()
            .push_back(result);
        self
    }

    /// Hold requests for `(tags, page)` until the returned semaphore gets a permit.
    pub fn gate(&self, tags: &str, page: u32) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.inner
            .lock()
            .unwrap()
            .gates
            .insert((tags.to_string(), page), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Yield until at least `n` fetches have been dispatched.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PostSource for ScriptedSource {
    async fn fetch_page(&self, tags: &str, page: u32) -> Result<Vec<Post>, FetchError> {
        let key = (tags.to_string(), page);
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(key.clone());
            inner.gates.get(&key).cloned()
        };

        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        self.inner
            .lock()
            .unwrap()
            .responses
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
