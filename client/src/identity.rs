//! Contracts of the identity provider and profile store the session layer
//! depends on.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use shared::Profile;
use std::cell::RefCell;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::transport::TransportError;

/// Signed-in subject as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

/// Short-lived bearer token. Never stored by the session layer.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already in use")]
    EmailExists,
    #[error("Weak password: {0}")]
    WeakPassword(String),
    #[error("No user is signed in")]
    NotSignedIn,
    #[error("Session is no longer valid: {0}")]
    SessionRevoked(String),
    #[error("Identity provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("Malformed provider response: {0}")]
    Malformed(String),
    #[error("Failed to persist sign-in: {0}")]
    Storage(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Profile store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Malformed profile record: {0}")]
    Malformed(String),
    #[error("Could not authorize profile access: {0}")]
    Credential(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Source of bearer credentials for privileged calls.
#[allow(async_fn_in_trait)]
pub trait CredentialSource {
    async fn bearer(&self) -> Result<Credential, AuthError>;
}

#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Stream of session changes. The current state is delivered first.
    /// Dropping the stream unsubscribes.
    fn observe_session_changes(&self) -> SessionChanges;

    async fn mint_credential(
        &self,
        identity: &Identity,
        force_refresh: bool,
    ) -> Result<Credential, AuthError>;
}

#[allow(async_fn_in_trait)]
pub trait ProfileStore {
    async fn write(&self, identity: &Identity, profile: &Profile) -> Result<(), ProfileError>;

    async fn read(&self, identity: &Identity) -> Result<Option<Profile>, ProfileError>;
}

/// Receiving half of a provider's session broadcast.
pub struct SessionChanges {
    receiver: UnboundedReceiver<Option<Identity>>,
}

impl Stream for SessionChanges {
    type Item = Option<Identity>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl fmt::Debug for SessionChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionChanges").finish_non_exhaustive()
    }
}

/// Fan-out used by providers. Closed receivers are pruned on the next publish.
#[derive(Default)]
pub struct SessionBroadcast {
    senders: RefCell<Vec<UnboundedSender<Option<Identity>>>>,
}

impl SessionBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, current: Option<Identity>) -> SessionChanges {
        let (sender, receiver) = unbounded();
        // A fresh channel cannot be closed yet.
        let _ = sender.unbounded_send(current);
        self.senders.borrow_mut().push(sender);
        SessionChanges { receiver }
    }

    pub fn publish(&self, change: Option<Identity>) {
        self.senders
            .borrow_mut()
            .retain(|sender| sender.unbounded_send(change.clone()).is_ok());
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.senders
            .borrow()
            .iter()
            .filter(|sender| !sender.is_closed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::executor::block_on;

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: None,
        }
    }

    #[test]
    fn subscriber_sees_current_state_then_changes() {
        let broadcast = SessionBroadcast::new();
        let mut changes = broadcast.subscribe(Some(identity("a")));
        broadcast.publish(None);

        block_on(async {
            assert_eq!(changes.next().await, Some(Some(identity("a"))));
            assert_eq!(changes.next().await, Some(None));
        });
    }

    #[test]
    fn dropped_stream_is_pruned() {
        let broadcast = SessionBroadcast::new();
        let changes = broadcast.subscribe(None);
        let _kept = broadcast.subscribe(None);
        assert_eq!(broadcast.subscriber_count(), 2);

        drop(changes);
        broadcast.publish(Some(identity("b")));
        assert_eq!(broadcast.subscriber_count(), 1);
        assert_eq!(broadcast.senders.borrow().len(), 1);
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("abc.def.ghi");
        assert_eq!(format!("{:?}", credential), "Credential(<11 chars>)");
    }
}
