//! Favorites API calls, gated on an authenticated session.

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error, warn};

use crate::auth::{self, GateError, Session, SharedAuth};
use crate::config::Config;
use crate::constants::authenticated_user_agent;

#[derive(Clone)]
pub struct FavoritesClient {
    client: Client,
    site_url: String,
    auth: SharedAuth,
}

impl FavoritesClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config, auth: SharedAuth) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self::with_client(client, config, auth))
    }

    #[must_use]
    pub fn with_client(client: Client, config: &Config, auth: SharedAuth) -> Self {
        Self {
            client,
            site_url: config.site_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Add a post to the logged-in user's favorites.
    ///
    /// # Errors
    ///
    /// [`GateError::NotAuthenticated`] without a session (no request is
    /// made), [`GateError::AuthRejected`] on HTTP 401 (the session is
    /// cleared), [`GateError::Transport`] for anything else.
    pub async fn add_favorite(&self, post_id: u64) -> Result<(), GateError> {
        let session = self.session()?;
        let url = format!("{}/favorites.json", self.site_url);
        debug!(post_id, "Adding favorite");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::USER_AGENT, authenticated_user_agent(&session.username))
            .basic_auth(&session.username, Some(&session.api_key))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(format!("post_id={post_id}"))
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response, post_id, false)
    }

    /// Remove a post from the logged-in user's favorites. A post that is not
    /// a favorite (HTTP 404) counts as removed.
    ///
    /// # Errors
    ///
    /// Same as [`FavoritesClient::add_favorite`].
    pub async fn remove_favorite(&self, post_id: u64) -> Result<(), GateError> {
        let session = self.session()?;
        let url = format!("{}/favorites/{post_id}.json", self.site_url);
        debug!(post_id, "Removing favorite");

        let response = self
            .client
            .delete(&url)
            .header(reqwest::header::USER_AGENT, authenticated_user_agent(&session.username))
            .basic_auth(&session.username, Some(&session.api_key))
            .send()
            .await
            .map_err(transport_error)?;

        self.check(response, post_id, true)
    }

    fn session(&self) -> Result<Session, GateError> {
        auth::lock(&self.auth)
            .session()
            .cloned()
            .ok_or(GateError::NotAuthenticated)
    }

    fn check(&self, response: Response, post_id: u64, missing_ok: bool) -> Result<(), GateError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::UNAUTHORIZED => {
                warn!(post_id, "Favorites request rejected, logging out");
                auth::lock(&self.auth).logout();
                Err(GateError::AuthRejected)
            }
            StatusCode::NOT_FOUND if missing_ok => {
                debug!(post_id, "Favorite already absent");
                Ok(())
            }
            _ => {
                error!(post_id, status = %status, "Favorites API error");
                Err(GateError::Transport {
                    status: Some(status.as_u16()),
                    message: format!("HTTP {status}"),
                })
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> GateError {
    error!("Favorites request failed: {e}");
    GateError::Transport {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}
