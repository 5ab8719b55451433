use std::sync::{Arc, Mutex};

use crate::errors::CoreError;
use crate::storage::token_store::{MemoryTokenStore, TokenStore};

/// Authentication state shared by all API clients of one user session.
///
/// Lifecycle: [`Session::init`] reads any stored token; [`Session::set_token`]
/// after login/register/refresh stores it; [`Session::teardown`] on logout or
/// a failed refresh clears it from memory and from the store.
pub struct Session {
    store: Arc<dyn TokenStore>,
    token: Mutex<Option<String>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Session {
    /// Start a session from whatever token the store holds.
    pub fn init(store: Arc<dyn TokenStore>) -> Result<Self, CoreError> {
        let token = store.load()?;
        if token.is_some() {
            log::debug!("Restored access token from store");
        }
        Ok(Self {
            store,
            token: Mutex::new(token),
        })
    }

    /// A session with no stored token and an in-memory store.
    pub fn anonymous() -> Self {
        Self {
            store: Arc::new(MemoryTokenStore::new()),
            token: Mutex::new(None),
        }
    }

    /// Current access token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Remember a new access token (memory and store).
    pub fn set_token(&self, token: &str) -> Result<(), CoreError> {
        self.store.save(token)?;
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    /// Forget the access token (memory and store).
    ///
    /// The in-memory token is dropped even if clearing the store fails.
    pub fn teardown(&self) -> Result<(), CoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.store.clear()
    }
}
