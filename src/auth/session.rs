use std::fmt;

use serde::{Deserialize, Serialize};

use super::GateError;
use crate::constants::MIN_API_KEY_LEN;

/// An authenticated account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Check credential input and return a trimmed session.
///
/// # Errors
///
/// Returns [`GateError::Validation`] for an empty username or key, or a key
/// shorter than [`MIN_API_KEY_LEN`].
pub fn validate_credentials(username: &str, api_key: &str) -> Result<Session, GateError> {
    let username = username.trim();
    let api_key = api_key.trim();

    if username.is_empty() {
        return Err(GateError::Validation("username cannot be empty".to_string()));
    }
    if api_key.is_empty() {
        return Err(GateError::Validation("API key cannot be empty".to_string()));
    }
    if api_key.chars().count() < MIN_API_KEY_LEN {
        return Err(GateError::Validation(format!(
            "API key must be at least {MIN_API_KEY_LEN} characters"
        )));
    }

    Ok(Session {
        username: username.to_string(),
        api_key: api_key.to_string(),
    })
}
