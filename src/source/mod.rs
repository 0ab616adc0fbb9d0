//! Remote post source.
//!
//! The feed talks to the API only through [`PostSource`], which hands back
//! already-normalized posts. [`RelayPostSource`] is the HTTP implementation.

mod relay;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Post;

pub use relay::RelayPostSource;

/// Failure while fetching a page of posts.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-2xx HTTP status.
    #[error("transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The relay envelope or the inner payload has the wrong shape.
    #[error("format error: {0}")]
    Format(String),
    #[error("unexpected error: {0}")]
    Unknown(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Coarse classification of a [`FetchError`], used for user-facing messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    Format,
    Unknown,
}

impl FetchErrorKind {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transport => "Failed to connect to e621. Please check your internet connection.",
            Self::Format => "Received invalid data from e621. Please try again.",
            Self::Unknown => "Unable to load posts from e621. Please try again later.",
        }
    }
}

impl FetchError {
    #[must_use]
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Transport { .. } => FetchErrorKind::Transport,
            Self::Format(_) => FetchErrorKind::Format,
            Self::Unknown(_) => FetchErrorKind::Unknown,
        }
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Format(e.to_string())
        } else if e.is_builder() {
            Self::Unknown(e.to_string())
        } else {
            Self::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

/// A paginated, tag-filterable source of posts.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch one page (1-based) of posts matching `tags`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the page could not be retrieved or decoded.
    async fn fetch_page(&self, tags: &str, page: u32) -> Result<Vec<Post>, FetchError>;

    /// Preview URL of an uploader's avatar, if the source can resolve one.
    async fn avatar_url(&self, _uploader_id: u64) -> Option<String> {
        None
    }
}
