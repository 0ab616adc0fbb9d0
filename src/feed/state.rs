//! Pure feed state transitions.
//!
//! Nothing here performs I/O. The controller asks for a [`LoadTicket`],
//! fetches with it, and feeds the result back through
//! [`FeedState::apply_page`]. Every ticket carries the query epoch it was
//! issued under, so a result that arrives after the query changed is
//! recognised and dropped.

use std::collections::HashSet;

use crate::models::Post;

/// What the renderer should do with newly available posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDelta {
    /// Discard whatever is shown and paint these posts.
    Replace(Vec<Post>),
    /// Paint these posts after the ones already shown.
    Append(Vec<Post>),
}

impl RenderDelta {
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        match self {
            Self::Replace(posts) | Self::Append(posts) => posts,
        }
    }
}

/// Permission to run one fetch, stamped with the query it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub epoch: u64,
    pub tags: String,
    pub page: u32,
}

/// Result of applying a fetched page to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Rendered(RenderDelta),
    /// Page was empty past the first page; fetch page 1 with this ticket
    /// and apply it through [`FeedState::apply_wraparound`].
    Wraparound(LoadTicket),
    /// The query has no posts at all.
    NoResults,
    /// The page-1 refetch after a wraparound was empty; nothing to paint.
    Unchanged,
    /// The ticket belongs to a query that has since been replaced.
    Stale,
}

/// Cursor, query and loaded posts for one feed.
#[derive(Debug, Clone)]
pub struct FeedState {
    default_tags: String,
    tags: String,
    page: u32,
    posts: Vec<Post>,
    seen_ids: HashSet<u64>,
    loading: bool,
    has_more: bool,
    epoch: u64,
    /// Epoch and cursor of the last load that failed, if not yet recovered.
    failed: Option<(u64, u32)>,
}

impl FeedState {
    #[must_use]
    pub fn new(default_tags: impl Into<String>) -> Self {
        Self {
            default_tags: default_tags.into(),
            tags: String::new(),
            page: 1,
            posts: Vec::new(),
            seen_ids: HashSet::new(),
            loading: false,
            has_more: true,
            epoch: 0,
            failed: None,
        }
    }

    /// Switch to a new tag query. Returns `false` (and changes nothing) if
    /// the trimmed query equals the current one.
    pub fn set_query(&mut self, tags: &str) -> bool {
        let tags = tags.trim();
        if tags == self.tags {
            return false;
        }
        self.tags = tags.to_string();
        self.reset();
        true
    }

    /// Point the cursor at the first page of the default query. Any load
    /// still in flight becomes stale.
    pub fn start_initial(&mut self) {
        self.tags.clone_from(&self.default_tags);
        self.reset();
    }

    fn reset(&mut self) {
        self.posts.clear();
        self.seen_ids.clear();
        self.page = 1;
        self.loading = false;
        self.has_more = true;
        self.failed = None;
        self.epoch += 1;
    }

    /// Move the cursor forward one page. Returns `false` if a load is in
    /// flight, in which case nothing changes.
    pub fn advance(&mut self) -> bool {
        if self.loading {
            return false;
        }
        if self.tags.is_empty() {
            self.tags.clone_from(&self.default_tags);
        }
        self.page += 1;
        true
    }

    /// Take the loading flag. Returns `None` if it is already held.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.loading {
            return None;
        }
        self.loading = true;
        Some(LoadTicket {
            epoch: self.epoch,
            tags: self.effective_tags().to_string(),
            page: self.page,
        })
    }

    /// Release the loading flag taken under `epoch`. A release from an
    /// abandoned query leaves the current query's flag alone.
    pub fn finish_load(&mut self, epoch: u64) {
        if epoch == self.epoch {
            self.loading = false;
        }
    }

    #[must_use]
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Remember that the load issued under `epoch` failed at the current cursor.
    pub fn record_failure(&mut self, epoch: u64) {
        if epoch == self.epoch {
            self.failed = Some((epoch, self.page));
        }
    }

    /// Whether the current cursor has a failed load to repeat.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.failed == Some((self.epoch, self.page))
    }

    /// Merge a fetched page.
    pub fn apply_page(&mut self, ticket: &LoadTicket, posts: Vec<Post>) -> PageOutcome {
        if !self.is_current(ticket) {
            return PageOutcome::Stale;
        }
        self.failed = None;

        if posts.is_empty() {
            return if ticket.page > 1 {
                PageOutcome::Wraparound(LoadTicket {
                    page: 1,
                    ..ticket.clone()
                })
            } else {
                PageOutcome::NoResults
            };
        }

        if ticket.page == 1 && self.posts.is_empty() {
            self.seen_ids = posts.iter().map(|p| p.id).collect();
            self.posts.clone_from(&posts);
            PageOutcome::Rendered(RenderDelta::Replace(posts))
        } else {
            self.append(&posts);
            PageOutcome::Rendered(RenderDelta::Append(posts))
        }
    }

    /// Merge the page-1 refetch that follows an empty page. The cursor is
    /// reset to 1 and the posts are appended even if already present.
    pub fn apply_wraparound(&mut self, ticket: &LoadTicket, posts: Vec<Post>) -> PageOutcome {
        if !self.is_current(ticket) {
            return PageOutcome::Stale;
        }
        self.failed = None;
        self.page = 1;
        if posts.is_empty() {
            return PageOutcome::Unchanged;
        }
        self.append(&posts);
        PageOutcome::Rendered(RenderDelta::Append(posts))
    }

    fn append(&mut self, posts: &[Post]) {
        self.seen_ids.extend(posts.iter().map(|p| p.id));
        self.posts.extend_from_slice(posts);
    }

    /// Tags sent to the source: the current query, or the default when empty.
    #[must_use]
    pub fn effective_tags(&self) -> &str {
        if self.tags.is_empty() {
            &self.default_tags
        } else {
            &self.tags
        }
    }

    #[must_use]
    pub fn tags(&self) -> &str {
        &self.tags
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Loaded posts in display order, including wraparound repeats.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Number of distinct post ids loaded.
    #[must_use]
    pub fn unique_len(&self) -> usize {
        self.seen_ids.len()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Always `true`; an empty page wraps around instead of ending the feed.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
