//! Session and token lifecycle management.
//!
//! This module provides:
//! - `CredentialStore`: durable token and profile storage over pluggable backends
//! - `inspect`: expiry introspection for JWT-shaped tokens
//! - `RefreshCoordinator`: single-flight token rotation
//! - `SessionManager`: the session projection and deterministic teardown
//! - `SessionGate`: the "log in to continue?" checkpoint for feature flows

pub mod gate;
pub mod inspect;
pub mod refresh;
pub mod session;
pub mod store;

pub use gate::{AuthPrompt, PromptChoice, PromptPresenter, PromptResponder, SessionGate};
pub use refresh::RefreshCoordinator;
pub use session::{Navigator, NoopNavigator, SessionManager};
pub use store::{CredentialKind, CredentialStore, FileStore, KeyringStore, MemoryStore, StorageBackend};
