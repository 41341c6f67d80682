//! Scripted collaborators for unit tests.

use futures::channel::oneshot;
use shared::Profile;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::identity::{
    AuthError, Credential, CredentialSource, Identity, IdentityProvider, ProfileError,
    ProfileStore, SessionBroadcast, SessionChanges,
};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};

/// Holds a scripted call pending until opened (or dropped).
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    fn new() -> (Self, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        (Self(sender), receiver)
    }

    pub fn open(self) {
        let _ = self.0.send(());
    }
}

async fn wait(gate: Option<oneshot::Receiver<()>>) {
    if let Some(gate) = gate {
        let _ = gate.await;
    }
}

struct Scripted {
    gate: Option<oneshot::Receiver<()>>,
    outcome: Result<ApiResponse, TransportError>,
}

#[derive(Default)]
pub struct FakeTransport {
    script: RefCell<VecDeque<Scripted>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) {
        self.script.borrow_mut().push_back(Scripted {
            gate: None,
            outcome: Ok(ApiResponse::new(status, body)),
        });
    }

    pub fn reply_when_opened(&self, status: u16, body: impl Into<String>) -> Gate {
        let (gate, receiver) = Gate::new();
        self.script.borrow_mut().push_back(Scripted {
            gate: Some(receiver),
            outcome: Ok(ApiResponse::new(status, body)),
        });
        gate
    }

    pub fn fail(&self, error: TransportError) {
        self.script.borrow_mut().push_back(Scripted {
            gate: None,
            outcome: Err(error),
        });
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        let next = self.script.borrow_mut().pop_front();
        match next {
            Some(scripted) => {
                wait(scripted.gate).await;
                scripted.outcome
            }
            None => Err(TransportError::Network("no scripted response".to_string())),
        }
    }
}

struct Account {
    uid: String,
    password: String,
}

/// In-memory identity provider. Every account's password is `password`
/// unless created through `create_account`.
#[derive(Default)]
pub struct FakeProvider {
    accounts: RefCell<HashMap<String, Account>>,
    current: RefCell<Option<Identity>>,
    broadcast: SessionBroadcast,
    mints: RefCell<Vec<bool>>,
    fail_sign_out: Cell<bool>,
    next_uid: Cell<u32>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, uid: &str, email: &str) -> Identity {
        self.accounts.borrow_mut().insert(
            email.to_string(),
            Account {
                uid: uid.to_string(),
                password: "password".to_string(),
            },
        );
        Identity {
            uid: uid.to_string(),
            email: Some(email.to_string()),
        }
    }

    /// Signed in before the app started, like a restored sign-in.
    pub fn with_signed_in(uid: &str, email: &str) -> Self {
        let provider = Self::new();
        let identity = provider.add_account(uid, email);
        *provider.current.borrow_mut() = Some(identity);
        provider
    }

    /// Simulates a change originating outside the app.
    pub fn emit(&self, change: Option<Identity>) {
        *self.current.borrow_mut() = change.clone();
        self.broadcast.publish(change);
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// `force_refresh` flag of every mint so far.
    pub fn mints(&self) -> Vec<bool> {
        self.mints.borrow().clone()
    }

    pub fn fail_sign_out(&self) {
        self.fail_sign_out.set(true);
    }

    fn identity_for(&self, email: &str, uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: Some(email.to_string()),
        }
    }
}

impl IdentityProvider for FakeProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if self.accounts.borrow().contains_key(email) {
            return Err(AuthError::EmailExists);
        }
        let uid = format!("uid-{}", self.next_uid.get());
        self.next_uid.set(self.next_uid.get() + 1);
        self.accounts.borrow_mut().insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        let identity = self.identity_for(email, &uid);
        self.emit(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let uid = match self.accounts.borrow().get(email) {
            Some(account) if account.password == password => account.uid.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };
        let identity = self.identity_for(email, &uid);
        self.emit(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_sign_out.get() {
            return Err(AuthError::Provider {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.emit(None);
        Ok(())
    }

    fn observe_session_changes(&self) -> SessionChanges {
        self.broadcast.subscribe(self.current())
    }

    async fn mint_credential(
        &self,
        identity: &Identity,
        force_refresh: bool,
    ) -> Result<Credential, AuthError> {
        let known = self
            .accounts
            .borrow()
            .values()
            .any(|account| account.uid == identity.uid);
        if !known {
            return Err(AuthError::NotSignedIn);
        }
        self.mints.borrow_mut().push(force_refresh);
        Ok(Credential::new(format!(
            "token-{}-{}",
            identity.uid,
            self.mints.borrow().len()
        )))
    }
}

/// In-memory profile store with per-subject gates and failures.
#[derive(Default)]
pub struct FakeProfiles {
    profiles: RefCell<HashMap<String, Profile>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    read_failures: RefCell<HashMap<String, ProfileError>>,
    write_failure: RefCell<Option<ProfileError>>,
}

impl FakeProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uid: &str, profile: Profile) {
        self.profiles.borrow_mut().insert(uid.to_string(), profile);
    }

    pub fn get(&self, uid: &str) -> Option<Profile> {
        self.profiles.borrow().get(uid).cloned()
    }

    /// The next read for `uid` waits until the gate opens.
    pub fn hold_next_read(&self, uid: &str) -> Gate {
        let (gate, receiver) = Gate::new();
        self.gates.borrow_mut().insert(uid.to_string(), receiver);
        gate
    }

    pub fn fail_reads(&self, uid: &str, error: ProfileError) {
        self.read_failures
            .borrow_mut()
            .insert(uid.to_string(), error);
    }

    pub fn fail_next_write(&self, error: ProfileError) {
        *self.write_failure.borrow_mut() = Some(error);
    }
}

impl ProfileStore for FakeProfiles {
    async fn write(&self, identity: &Identity, profile: &Profile) -> Result<(), ProfileError> {
        if let Some(error) = self.write_failure.borrow_mut().take() {
            return Err(error);
        }
        self.insert(&identity.uid, profile.clone());
        Ok(())
    }

    async fn read(&self, identity: &Identity) -> Result<Option<Profile>, ProfileError> {
        let gate = self.gates.borrow_mut().remove(&identity.uid);
        wait(gate).await;

        if let Some(error) = self.read_failures.borrow().get(&identity.uid) {
            return Err(error.clone());
        }
        Ok(self.get(&identity.uid))
    }
}

/// Hands out the same token every time and counts how often it was asked.
pub struct StaticCredential {
    token: Option<String>,
    calls: Cell<usize>,
}

impl StaticCredential {
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            token: None,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl CredentialSource for StaticCredential {
    async fn bearer(&self) -> Result<Credential, AuthError> {
        self.calls.set(self.calls.get() + 1);
        self.token
            .as_deref()
            .map(Credential::new)
            .ok_or(AuthError::NotSignedIn)
    }
}

pub fn sample_profile(name: &str) -> Profile {
    Profile {
        name: name.to_string(),
        age: 54,
        gender: "Male".to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}
