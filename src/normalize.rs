//! Mapping of raw API post records into [`Post`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::models::{MediaExtension, Post, PostTags, Rating, Score};

/// A post record as returned by the API. Every nested object may be
/// absent or `null`.
#[derive(Debug, Default, Deserialize)]
pub struct RawPost {
    pub id: Option<u64>,
    pub file: Option<RawFile>,
    pub preview: Option<RawPreview>,
    pub tags: Option<RawTags>,
    pub score: Option<RawScore>,
    pub fav_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub created_at: Option<String>,
    pub rating: Option<String>,
    pub description: Option<String>,
    pub uploader_id: Option<u64>,
    pub uploader_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFile {
    pub url: Option<String>,
    pub ext: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPreview {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTags {
    pub general: Option<Vec<String>>,
    pub species: Option<Vec<String>>,
    pub character: Option<Vec<String>>,
    pub artist: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawScore {
    pub up: Option<i64>,
    pub down: Option<i64>,
    pub total: Option<i64>,
}

/// Normalize a page of undecoded records.
///
/// Records that do not decode as a post are dropped individually; the
/// survivors keep their relative order.
#[must_use]
pub fn normalize_posts(records: Vec<serde_json::Value>) -> Vec<Post> {
    let total = records.len();
    let posts: Vec<Post> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<RawPost>(record) {
            Ok(raw) => Some(raw),
            Err(e) => {
                debug!(error = %e, "Dropping undecodable post record");
                None
            }
        })
        .filter_map(normalize_post)
        .collect();

    if posts.len() < total {
        debug!(kept = posts.len(), dropped = total - posts.len(), "Normalized posts");
    }
    posts
}

/// Normalize a single decoded record.
///
/// Returns `None` when the record has no id or no media URL.
#[must_use]
pub fn normalize_post(raw: RawPost) -> Option<Post> {
    let id = raw.id?;
    let file = raw.file.unwrap_or_default();
    let media_url = non_empty(file.url)?;
    let tags = raw.tags.unwrap_or_default();
    let score = raw.score.unwrap_or_default();

    Some(Post {
        id,
        media_url,
        media_extension: non_empty(file.ext)
            .map_or_else(MediaExtension::default, |ext| MediaExtension::from_ext(&ext)),
        preview_url: raw.preview.and_then(|p| non_empty(p.url)),
        tags: PostTags {
            general: tags.general.unwrap_or_default(),
            species: tags.species.unwrap_or_default(),
            character: tags.character.unwrap_or_default(),
            artist: tags.artist.unwrap_or_default(),
        },
        score: Score {
            up: score.up.unwrap_or(0),
            down: score.down.unwrap_or(0),
            total: score.total.unwrap_or(0),
        },
        fav_count: raw.fav_count.unwrap_or(0),
        comment_count: raw.comment_count.unwrap_or(0),
        created_at: raw.created_at.as_deref().and_then(parse_timestamp),
        rating: raw
            .rating
            .as_deref()
            .and_then(Rating::from_code)
            .unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        uploader_id: raw.uploader_id,
        uploader_name: non_empty(raw.uploader_name).unwrap_or_else(|| "Anonymous".to_string()),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
