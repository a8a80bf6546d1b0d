//! Mutable per-client session state.

use parking_lot::RwLock;

/// Session state shared by every call through one client.
#[derive(Debug, Default)]
pub struct SessionState {
    bearer: RwLock<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate subsequent calls with a bearer token instead of cookies.
    pub fn set_bearer_token(&self, token: impl Into<String>) {
        *self.bearer.write() = Some(token.into());
    }

    pub fn clear_bearer_token(&self) {
        *self.bearer.write() = None;
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.bearer.read().clone()
    }
}
