//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Store;
use crate::services::TokenVerifier;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    verifier: TokenVerifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Catalog and order storage
    /// * `verifier` - Bearer token verifier
    #[must_use]
    pub fn new(store: Arc<dyn Store>, verifier: TokenVerifier) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, verifier }),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the token verifier.
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }
}
