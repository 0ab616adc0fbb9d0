//! Presentation helpers for rendering a post as a timeline entry.

use chrono::{DateTime, Utc};

use crate::models::Post;

/// Maximum number of tags shown under a post.
const MAX_DISPLAY_TAGS: usize = 8;

/// Compact relative age: `45s`, `12m`, `3h`, `20d`.
#[must_use]
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

/// Compact count: `999`, `1.5K`, `2.0M`.
#[must_use]
pub fn format_number(n: i64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1000 {
        format!("{:.1}K", n as f64 / 1000.0)
    } else {
        n.to_string()
    }
}

/// Name shown as the post's author: the first artist tag, or a placeholder.
#[must_use]
pub fn artist_name(post: &Post) -> String {
    post.tags.artist.first().map_or_else(
        || format!("Artist_{}", post.id),
        |artist| artist.replace('_', " "),
    )
}

/// `@handle` derived from a display name.
#[must_use]
pub fn user_handle(name: &str) -> String {
    let handle: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("@{handle}")
}

/// Body text: the description, or a generated caption when it is blank.
#[must_use]
pub fn post_text(post: &Post) -> String {
    let description = post.description.trim();
    if !description.is_empty() {
        return description.to_string();
    }
    if post.tags.species.is_empty() {
        format!("Post #{}", post.id)
    } else {
        format!("Post #{} - {}", post.id, post.tags.species.join(", "))
    }
}

/// Tags shown under a post: up to four general, two species and two
/// character tags.
#[must_use]
pub fn display_tags(post: &Post) -> Vec<&str> {
    post.tags
        .general
        .iter()
        .take(4)
        .chain(post.tags.species.iter().take(2))
        .chain(post.tags.character.iter().take(2))
        .take(MAX_DISPLAY_TAGS)
        .map(String::as_str)
        .collect()
}

/// Counts shown in a post's engagement bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub replies: i64,
    pub reposts: i64,
    pub likes: i64,
    pub views: i64,
}

impl Engagement {
    #[must_use]
    pub fn of(post: &Post) -> Self {
        Self {
            replies: post.comment_count,
            reposts: post.score.total / 10,
            likes: post.fav_count,
            views: post.score.up * 10,
        }
    }
}

/// Public page of a post.
#[must_use]
pub fn post_page_url(site_url: &str, post_id: u64) -> String {
    format!("{}/posts/{post_id}", site_url.trim_end_matches('/'))
}
