// Allow dead code: dismissal paths the CLI presenter does not drive
#![allow(dead_code)]

//! Authentication gate for feature flows.
//!
//! Flows that need an identity consult the gate before acting. The fast
//! path is a synchronous check; the slow path asks the user whether they
//! want to log in, through whatever surface the presenter provides. The
//! prompt can be dismissed four ways - confirm, decline, backdrop, escape -
//! and exactly the first one counts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

use crate::auth::session::SessionManager;

/// How an auth prompt was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// "Take me to login"
    Confirm,
    /// "Not now"
    Decline,
    /// Click outside the prompt surface
    Backdrop,
    /// Cancel key
    Escape,
}

/// Settle handle shared by all four dismissal paths. The first call to
/// `settle` consumes the sender; the other three paths become no-ops.
#[derive(Clone)]
pub struct PromptResponder {
    sender: Arc<Mutex<Option<oneshot::Sender<PromptChoice>>>>,
}

impl PromptResponder {
    fn new() -> (Self, oneshot::Receiver<PromptChoice>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    pub fn confirm(&self) {
        self.settle(PromptChoice::Confirm);
    }

    pub fn decline(&self) {
        self.settle(PromptChoice::Decline);
    }

    pub fn dismiss_backdrop(&self) {
        self.settle(PromptChoice::Backdrop);
    }

    pub fn dismiss_escape(&self) {
        self.settle(PromptChoice::Escape);
    }

    fn settle(&self, choice: PromptChoice) {
        let sender = self
            .sender
            .lock()
            .expect("prompt settle lock poisoned")
            .take();
        match sender {
            // The gate may already have been abandoned; a dead receiver is fine.
            Some(tx) => {
                let _ = tx.send(choice);
            }
            None => debug!(?choice, "Prompt already settled, ignoring"),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.sender
            .lock()
            .expect("prompt settle lock poisoned")
            .is_none()
    }
}

/// One pending "log in to continue?" prompt.
pub struct AuthPrompt {
    pub id: u64,
    /// Human description of the blocked action, e.g. "top up your card"
    pub action: String,
    pub responder: PromptResponder,
}

/// UI seam for the gate. `present` must not block; the user's answer
/// arrives through the prompt's responder.
pub trait PromptPresenter: Send + Sync {
    fn present(&self, prompt: AuthPrompt);
    /// Remove the prompt's surface. Called exactly once per prompt, on
    /// every resolution path including abandonment.
    fn dismiss(&self, prompt_id: u64);
}

/// Dismisses the prompt UI exactly once, even if the awaiting flow is
/// dropped mid-prompt.
struct TeardownGuard {
    presenter: Arc<dyn PromptPresenter>,
    id: u64,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.presenter.dismiss(self.id);
    }
}

pub struct SessionGate {
    session: Arc<SessionManager>,
    presenter: Arc<dyn PromptPresenter>,
    next_prompt_id: AtomicU64,
}

impl SessionGate {
    pub fn new(session: Arc<SessionManager>, presenter: Arc<dyn PromptPresenter>) -> Self {
        Self {
            session,
            presenter,
            next_prompt_id: AtomicU64::new(1),
        }
    }

    /// Fast path: no network, no UI.
    pub fn require_auth(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Slow path. Resolves `true` only when already authenticated; the
    /// prompt itself never grants access, it only offers a way to log in.
    /// The caller decides what happens after a successful login - the
    /// blocked action is never retried automatically.
    pub async fn prompt_for_auth(&self, action: &str) -> bool {
        if self.session.is_authenticated() {
            return true;
        }

        let id = self.next_prompt_id.fetch_add(1, Ordering::Relaxed);
        let (responder, answer) = PromptResponder::new();
        let teardown = TeardownGuard {
            presenter: Arc::clone(&self.presenter),
            id,
        };

        debug!(id, action, "Presenting auth prompt");
        self.presenter.present(AuthPrompt {
            id,
            action: action.to_string(),
            responder,
        });

        // A presenter that drops the responder unanswered counts as escape.
        let choice = answer.await.unwrap_or(PromptChoice::Escape);
        drop(teardown);

        if choice == PromptChoice::Confirm {
            debug!(id, "User chose to log in");
            self.session.to_login();
        }
        false
    }
}
