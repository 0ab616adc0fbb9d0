//! Client-side credentials and the authenticated capability gate.

pub mod session;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{info, warn};

use crate::constants::AUTH_STORE_KEY;

pub use session::{validate_credentials, Session};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

/// Failure of an authenticated operation.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("please log in to manage favorites")]
    NotAuthenticated,
    #[error("authentication failed, please check your login credentials")]
    AuthRejected,
    #[error("invalid credentials: {0}")]
    Validation(String),
    #[error("favorites request failed: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
}

/// Auth store shared between the app and the favorites gate.
pub type SharedAuth = Arc<Mutex<AuthStore>>;

/// Owns the session and its persisted copy.
pub struct AuthStore {
    backend: Box<dyn KeyValueStore>,
    session: Option<Session>,
}

impl AuthStore {
    /// An unauthenticated store over `backend`. Call [`AuthStore::restore`]
    /// to pick up a saved session.
    #[must_use]
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            session: None,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedAuth {
        Arc::new(Mutex::new(self))
    }

    /// Load a persisted session. A missing or unreadable record leaves the
    /// store unauthenticated; an unreadable record is removed.
    pub fn restore(&mut self) -> bool {
        let saved = match self.backend.get(AUTH_STORE_KEY) {
            Ok(Some(saved)) => saved,
            Ok(None) => return false,
            Err(e) => {
                warn!("Could not read saved credentials: {e}");
                return false;
            }
        };

        match serde_json::from_str::<Session>(&saved) {
            Ok(session) => {
                info!(username = %session.username, "User authenticated from saved credentials");
                self.session = Some(session);
                true
            }
            Err(e) => {
                warn!("Invalid saved credentials, clearing: {e}");
                if let Err(e) = self.backend.remove(AUTH_STORE_KEY) {
                    warn!("Could not clear saved credentials: {e}");
                }
                false
            }
        }
    }

    /// Validate and store credentials. No network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Validation`] if the input fails local checks; the
    /// existing session and persisted record are left as they were.
    pub fn login(&mut self, username: &str, api_key: &str) -> Result<(), GateError> {
        let session = validate_credentials(username, api_key)?;

        match serde_json::to_string(&session) {
            Ok(json) => {
                if let Err(e) = self.backend.set(AUTH_STORE_KEY, &json) {
                    warn!("Could not persist credentials, session will not survive restart: {e}");
                }
            }
            Err(e) => warn!("Could not encode credentials: {e}"),
        }

        info!(username = %session.username, "Logged in");
        self.session = Some(session);
        Ok(())
    }

    /// Drop the session and its persisted copy.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!(username = %session.username, "Logged out");
        }
        if let Err(e) = self.backend.remove(AUTH_STORE_KEY) {
            warn!("Could not clear saved credentials: {e}");
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }
}

/// Lock a shared auth store, recovering from a poisoned lock.
pub fn lock(auth: &SharedAuth) -> MutexGuard<'_, AuthStore> {
    auth.lock().unwrap_or_else(PoisonError::into_inner)
}
