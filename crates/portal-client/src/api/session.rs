//! [`Session`]: the bearer token attached to outgoing requests.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Lock-free, swappable slot for the current bearer token.
///
/// Clones share the same slot, so a `logout` on one handle is seen by every
/// request in flight afterwards.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<ArcSwapOption<String>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts out authenticated.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.login(token);
        session
    }

    /// Replace the current token.
    pub fn login(&self, token: impl Into<String>) {
        self.token.store(Some(Arc::new(token.into())));
    }

    /// Drop the current token.
    pub fn logout(&self) {
        self.token.store(None);
    }

    /// Current token, if any.
    pub fn bearer(&self) -> Option<Arc<String>> {
        self.token.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
