//! Shared constants used across the application.

/// Tag query used when the user has not searched for anything.
pub const DEFAULT_TAGS: &str = "female";

/// Number of posts requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest `limit` the posts endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 320;

/// Key under which credentials are persisted in the local store.
pub const AUTH_STORE_KEY: &str = "e621_auth";

/// Minimum accepted API key length at credential capture time.
pub const MIN_API_KEY_LEN: usize = 20;

/// User agent for anonymous read requests.
pub const FEED_USER_AGENT: &str = "E621Feed/1.0";

/// User agent for authenticated requests, naming the account as the API asks.
#[must_use]
pub fn authenticated_user_agent(username: &str) -> String {
    format!("{FEED_USER_AGENT} (by {username} on e621)")
}
