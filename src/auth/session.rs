// Allow dead code: infrastructure methods for embedding contexts
#![allow(dead_code)]

//! Session state and teardown.
//!
//! "Authenticated" is a projection, not stored state: the session exists
//! exactly while a non-empty access token sits in the credential store.
//! Teardown is deterministic and shared by explicit logout and every
//! unrecoverable auth failure path.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::inspect;
use crate::auth::store::{CredentialKind, CredentialStore};
use crate::models::Profile;

/// Routing seam. The dispatcher and the gate must be able to send the user
/// to the login view without knowing what a "view" is.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
    fn current_is_login(&self) -> bool;
}

/// Navigator for headless contexts: never navigates.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn to_login(&self) {}

    fn current_is_login(&self) -> bool {
        true
    }
}

pub struct SessionManager {
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionManager {
    pub fn new(store: Arc<CredentialStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(CredentialKind::AccessToken)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Seconds until the stored access token expires, when the token
    /// encodes that. `None` means unknown, not expired.
    pub fn token_ttl(&self) -> Option<i64> {
        inspect::time_to_expiry(&self.access_token()?)
    }

    pub fn cached_profile(&self) -> Option<Profile> {
        self.store.profile()
    }

    /// Route to the login view unless already there.
    pub fn to_login(&self) {
        if !self.navigator.current_is_login() {
            self.navigator.to_login();
        }
    }

    /// Deterministic teardown: clear every credential first, then navigate.
    /// Idempotent - calling it twice in quick succession neither navigates
    /// twice nor fails on already-absent keys.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "Credential teardown was incomplete");
        }
        info!("Session ended");
        self.to_login();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Navigator that records navigations and models a real view stack:
    /// once routed to login, it reports being there.
    #[derive(Default)]
    pub(crate) struct FakeNavigator {
        pub navigations: AtomicUsize,
        at_login: AtomicBool,
    }

    impl Navigator for FakeNavigator {
        fn to_login(&self) {
            self.navigations.fetch_add(1, Ordering::SeqCst);
            self.at_login.store(true, Ordering::SeqCst);
        }

        fn current_is_login(&self) -> bool {
            self.at_login.load(Ordering::SeqCst)
        }
    }

    impl FakeNavigator {
        pub fn navigation_count(&self) -> usize {
            self.navigations.load(Ordering::SeqCst)
        }
    }
}
