use std::sync::Arc;

use crate::session::store::CredentialStore;

/// Advisory "is this client authenticated?" check.
///
/// Requires two independent signals from the credential store: a stored
/// access token and an unexpired session marker. The backend still enforces
/// authorization on every call.
#[derive(Clone)]
pub struct SessionGate {
    store: Arc<CredentialStore>,
}

impl SessionGate {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_marked_authenticated()
    }
}
