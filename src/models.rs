use chrono::{DateTime, Utc};
use serde::Serialize;

/// A normalized post as held in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: u64,
    pub media_url: String,
    pub media_extension: MediaExtension,
    pub preview_url: Option<String>,
    pub tags: PostTags,
    pub score: Score,
    pub fav_count: i64,
    pub comment_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub rating: Rating,
    pub description: String,
    pub uploader_id: Option<u64>,
    pub uploader_name: String,
}

impl Post {
    /// Whether the media should be presented as a video rather than an image.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.media_extension.is_video()
    }
}

/// Tag groups in the order the API returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostTags {
    pub general: Vec<String>,
    pub species: Vec<String>,
    pub character: Vec<String>,
    pub artist: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Score {
    pub up: i64,
    pub down: i64,
    pub total: i64,
}

/// Content rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    #[default]
    Safe,
    Questionable,
    Explicit,
}

impl Rating {
    /// Parse the API's rating code. Unknown values yield `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "s" | "safe" => Some(Self::Safe),
            "q" | "questionable" => Some(Self::Questionable),
            "e" | "explicit" => Some(Self::Explicit),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Safe => "s",
            Self::Questionable => "q",
            Self::Explicit => "e",
        }
    }

    /// Human-readable label shown on the rating badge.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Questionable => "Questionable",
            Self::Explicit => "Explicit",
        }
    }
}

/// File extension of the primary media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaExtension {
    #[default]
    Jpg,
    Png,
    Gif,
    Webm,
    Mp4,
    Swf,
    Other(String),
}

impl MediaExtension {
    #[must_use]
    pub fn from_ext(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webm" => Self::Webm,
            "mp4" => Self::Mp4,
            "swf" => Self::Swf,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Swf => "swf",
            Self::Other(ext) => ext,
        }
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Webm | Self::Mp4)
    }
}
