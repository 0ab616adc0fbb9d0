//! Feed state controller.
//!
//! [`FeedController`] decides what to fetch and merges results into the
//! feed. At most one load runs at a time; a load that finds an empty page
//! past the first wraps the cursor back to page 1 and keeps appending, so
//! the feed never ends.

mod retry;
mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::models::Post;
use crate::source::{FetchError, FetchErrorKind, PostSource};

pub use retry::RetryPolicy;
pub use state::{FeedState, LoadTicket, PageOutcome, RenderDelta};

/// A fetch failure translated for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub kind: FetchErrorKind,
    pub message: &'static str,
    pub detail: String,
}

impl From<&FetchError> for FeedFailure {
    fn from(e: &FetchError) -> Self {
        let kind = e.kind();
        Self {
            kind,
            message: kind.user_message(),
            detail: e.to_string(),
        }
    }
}

/// Result of a feed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Rendered(RenderDelta),
    /// The query matched nothing; whatever placeholder is shown should be
    /// replaced with an empty state.
    NoResults,
    /// Nothing to do: the query was already current, there was no failed
    /// load to retry, or a wraparound refetch came back empty.
    Unchanged,
    /// Another load is in flight.
    Skipped,
    /// The query changed while this load was in flight; its result was dropped.
    Stale,
    /// Cursor and posts are untouched; [`FeedController::retry`] refetches
    /// the same page.
    Failed(FeedFailure),
}

/// Point-in-time view of the feed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub tags: String,
    pub page: u32,
    pub loading: bool,
    pub has_more: bool,
    pub post_count: usize,
    pub unique_count: usize,
}

pub struct FeedController<S> {
    source: S,
    retry: RetryPolicy,
    state: Mutex<FeedState>,
}

/// Clears the loading flag when a load ends, however it ends.
struct LoadingGuard<'a> {
    state: &'a Mutex<FeedState>,
    epoch: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish_load(self.epoch);
    }
}

impl<S: PostSource> FeedController<S> {
    #[must_use]
    pub fn new(source: S, retry: RetryPolicy, default_tags: impl Into<String>) -> Self {
        Self {
            source,
            retry,
            state: Mutex::new(FeedState::new(default_tags)),
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the first page of the default query.
    pub async fn load_initial(&self) -> LoadOutcome {
        self.lock().start_initial();
        self.load().await
    }

    /// Replace the current query and load its first page.
    pub async fn set_query(&self, tags: &str) -> LoadOutcome {
        if !self.lock().set_query(tags) {
            debug!(tags = %tags.trim(), "Query unchanged");
            return LoadOutcome::Unchanged;
        }
        info!(tags = %tags.trim(), "New search");
        self.load().await
    }

    /// Load the next page.
    pub async fn load_more(&self) -> LoadOutcome {
        if !self.lock().advance() {
            debug!("Load already in flight, ignoring load_more");
            return LoadOutcome::Skipped;
        }
        self.load().await
    }

    /// Reload the current page after a failure. Returns
    /// [`LoadOutcome::Unchanged`] if the last load at this cursor succeeded.
    pub async fn retry(&self) -> LoadOutcome {
        if !self.lock().can_retry() {
            debug!("Nothing to retry");
            return LoadOutcome::Unchanged;
        }
        self.load().await
    }

    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.lock();
        FeedSnapshot {
            tags: state.tags().to_string(),
            page: state.page(),
            loading: state.is_loading(),
            has_more: state.has_more(),
            post_count: state.posts().len(),
            unique_count: state.unique_len(),
        }
    }

    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts().to_vec()
    }

    /// Find a loaded post by id.
    #[must_use]
    pub fn post(&self, id: u64) -> Option<Post> {
        self.lock().posts().iter().find(|p| p.id == id).cloned()
    }

    async fn load(&self) -> LoadOutcome {
        let Some(ticket) = self.lock().begin_load() else {
            debug!("Load already in flight");
            return LoadOutcome::Skipped;
        };
        let _guard = LoadingGuard {
            state: &self.state,
            epoch: ticket.epoch,
        };

        info!(tags = %ticket.tags, page = ticket.page, "Loading posts");
        let posts = match self.fetch(&ticket).await {
            Ok(posts) => posts,
            Err(outcome) => return self.failed(&ticket, outcome),
        };
        let received = posts.len();

        let outcome = self.lock().apply_page(&ticket, posts);
        let outcome = match outcome {
            PageOutcome::Wraparound(reset) => {
                info!(page = ticket.page, "No posts on page, resetting to page 1 for endless scroll");
                match self.fetch(&reset).await {
                    Ok(posts) => self.lock().apply_wraparound(&reset, posts),
                    Err(outcome) => return self.failed(&reset, outcome),
                }
            }
            other => other,
        };

        let total = self.lock().posts().len();
        match outcome {
            PageOutcome::Rendered(delta) => {
                info!(received, total, "Posts loaded");
                LoadOutcome::Rendered(delta)
            }
            PageOutcome::NoResults => {
                info!(tags = %ticket.tags, "No posts found");
                LoadOutcome::NoResults
            }
            PageOutcome::Unchanged => {
                info!(tags = %ticket.tags, "First page empty after wraparound");
                LoadOutcome::Unchanged
            }
            PageOutcome::Stale | PageOutcome::Wraparound(_) => {
                debug!(epoch = ticket.epoch, "Discarding response for abandoned query");
                LoadOutcome::Stale
            }
        }
    }

    /// Fetch one page, retrying transport failures per the retry policy.
    async fn fetch(&self, ticket: &LoadTicket) -> Result<Vec<Post>, LoadOutcome> {
        let mut attempt = 1;
        loop {
            match self.source.fetch_page(&ticket.tags, ticket.page).await {
                Ok(posts) => return Ok(posts),
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        tags = %ticket.tags,
                        page = ticket.page,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Fetch failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    if !self.lock().is_current(ticket) {
                        return Err(LoadOutcome::Stale);
                    }
                    attempt += 1;
                }
                Err(e) if !self.lock().is_current(ticket) => {
                    debug!(epoch = ticket.epoch, "Ignoring failure for abandoned query: {e}");
                    return Err(LoadOutcome::Stale);
                }
                Err(e) => {
                    error!(tags = %ticket.tags, page = ticket.page, "Error loading posts: {e}");
                    return Err(LoadOutcome::Failed(FeedFailure::from(&e)));
                }
            }
        }
    }

    fn failed(&self, ticket: &LoadTicket, outcome: LoadOutcome) -> LoadOutcome {
        if matches!(outcome, LoadOutcome::Failed(_)) {
            self.lock().record_failure(ticket.epoch);
        }
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
