use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{FetchError, PostSource};
use crate::config::Config;
use crate::constants::FEED_USER_AGENT;
use crate::models::Post;
use crate::normalize::normalize_posts;

/// Envelope returned by the CORS relay. `contents` holds the target's body
/// as a JSON-encoded string.
#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    contents: Option<String>,
    status: Option<RelayStatus>,
}

#[derive(Debug, Deserialize)]
struct RelayStatus {
    http_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PostsPayload {
    posts: Vec<serde_json::Value>,
}

/// HTTP post source, optionally routed through a relay.
#[derive(Clone)]
pub struct RelayPostSource {
    client: Client,
    site_url: String,
    relay_url: Option<String>,
    page_size: u32,
}

impl RelayPostSource {
    /// Create a source from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(FEED_USER_AGENT)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a source that reuses an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            site_url: config.site_url.trim_end_matches('/').to_string(),
            relay_url: config.relay_enabled.then(|| config.relay_url.clone()),
            page_size: config.page_size,
        }
    }

    /// Build the target URL for one page of a tag query.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unknown`] if the configured site URL is unusable.
    pub fn posts_url(&self, tags: &str, page: u32) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}/posts.json", self.site_url))
            .map_err(|e| FetchError::Unknown(format!("invalid posts URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("tags", tags)
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// The URL actually requested for `target`, after relay wrapping.
    #[must_use]
    pub fn request_url(&self, target: &str) -> String {
        match &self.relay_url {
            Some(relay) => format!("{relay}?url={}", urlencoding::encode(target)),
            None => target.to_string(),
        }
    }

    /// Look up the preview image of an uploader's avatar post.
    ///
    /// Best effort: any failure along the way yields `None`.
    pub async fn lookup_avatar(&self, uploader_id: u64) -> Option<String> {
        let user_url = format!("{}/users/{uploader_id}.json", self.site_url);
        let user = match self.get_json(&user_url).await {
            Ok(user) => user,
            Err(e) => {
                debug!(uploader_id, error = %e, "Could not fetch user profile");
                return None;
            }
        };
        let avatar_id = user.get("avatar_id").and_then(serde_json::Value::as_u64)?;

        let post_url = format!("{}/posts/{avatar_id}.json", self.site_url);
        match self.get_json(&post_url).await {
            Ok(avatar) => avatar
                .pointer("/post/preview/url")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
            Err(e) => {
                debug!(uploader_id, avatar_id, error = %e, "Could not fetch avatar post");
                None
            }
        }
    }

    /// GET `target` and decode the JSON body, unwrapping the relay envelope
    /// when a relay is configured.
    async fn get_json(&self, target: &str) -> Result<serde_json::Value, FetchError> {
        let request_url = self.request_url(target);
        debug!(url = %target, relayed = self.relay_url.is_some(), "Fetching");

        let response = self
            .client
            .get(&request_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                status: Some(status.as_u16()),
                message: format!("HTTP error! status: {status}"),
            });
        }

        let body = response.text().await?;
        if self.relay_url.is_some() {
            decode_envelope(&body)
        } else {
            serde_json::from_str(&body)
                .map_err(|e| FetchError::Format(format!("response is not JSON: {e}")))
        }
    }
}

/// Decode a relay envelope and the JSON document embedded in it.
fn decode_envelope(body: &str) -> Result<serde_json::Value, FetchError> {
    let envelope: RelayEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::Format(format!("relay envelope is not JSON: {e}")))?;

    if let Some(code) = envelope.status.and_then(|s| s.http_code) {
        if !(200..300).contains(&code) {
            warn!(status = code, "Relay reported upstream failure");
            return Err(FetchError::Transport {
                status: Some(code),
                message: format!("upstream returned HTTP {code}"),
            });
        }
    }

    let contents = envelope
        .contents
        .ok_or_else(|| FetchError::Format("relay envelope has no contents".to_string()))?;
    serde_json::from_str(&contents)
        .map_err(|e| FetchError::Format(format!("relay contents are not JSON: {e}")))
}

#[async_trait]
impl PostSource for RelayPostSource {
    async fn fetch_page(&self, tags: &str, page: u32) -> Result<Vec<Post>, FetchError> {
        let url = self.posts_url(tags, page)?;
        let payload = self.get_json(url.as_str()).await?;

        let payload: PostsPayload = serde_json::from_value(payload)
            .map_err(|e| FetchError::Format(format!("Invalid API response format: {e}")))?;

        debug!(tags = %tags, page, records = payload.posts.len(), "API response received");
        Ok(normalize_posts(payload.posts))
    }

    async fn avatar_url(&self, uploader_id: u64) -> Option<String> {
        self.lookup_avatar(uploader_id).await
    }
}
