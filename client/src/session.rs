//! Session store: who is signed in, their profile, and the transitions
//! between those states.

use futures::StreamExt;
use futures::lock::Mutex;
use shared::Profile;
use std::cell::RefCell;
use std::rc::Rc;

use crate::identity::{
    AuthError, Credential, CredentialSource, Identity, IdentityProvider, ProfileError,
    ProfileStore,
};
use crate::listeners::{Listeners, Subscription};
use crate::transport::TransportError;

/// Either fully absent or signed in; a profile never exists without an
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
    profile: Option<Profile>,
}

impl Session {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity, profile: Option<Profile>) -> Self {
        Self {
            identity: Some(identity),
            profile,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Profile email first, then whatever the provider knows.
    pub fn email(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .map(|profile| profile.email.as_str())
            .filter(|email| !email.is_empty())
            .or_else(|| self.identity.as_ref()?.email.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionResolutionError {
    #[error("Failed to load profile: {0}")]
    Profile(#[from] ProfileError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Invalid registration: {0}")]
    Invalid(String),
    #[error("Account creation failed: {0}")]
    Account(AuthError),
    #[error("Account created but profile could not be saved: {0}")]
    Profile(ProfileError),
}

impl RegistrationError {
    pub fn user_message(&self) -> String {
        match self {
            RegistrationError::Invalid(reason) => reason.clone(),
            RegistrationError::Account(AuthError::EmailExists) => {
                "Failed to create an account. The email might already be in use.".to_string()
            }
            RegistrationError::Account(AuthError::WeakPassword(detail)) => {
                format!("Please choose a stronger password ({}).", detail)
            }
            RegistrationError::Account(AuthError::Transport(_)) => {
                "Could not reach the sign-up service. Please try again.".to_string()
            }
            RegistrationError::Account(_) => "Failed to create an account.".to_string(),
            RegistrationError::Profile(_) => {
                "Your account was created, but your profile could not be saved.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Login failed: {0}")]
pub struct LoginError(#[from] pub AuthError);

impl LoginError {
    pub fn user_message(&self) -> String {
        match &self.0 {
            AuthError::Transport(TransportError::Network(_)) => {
                "Could not reach the sign-in service. Please try again.".to_string()
            }
            _ => "Failed to log in. Please check your credentials.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Logout failed: {0}")]
pub struct LogoutError(#[from] pub AuthError);

impl LogoutError {
    pub fn user_message(&self) -> String {
        "Failed to log out. Please try again.".to_string()
    }
}

const MIN_PASSWORD_LEN: usize = 6;
const MAX_AGE: u32 = 130;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let invalid = |reason: &str| Err(RegistrationError::Invalid(reason.to_string()));

        if self.name.trim().is_empty() {
            return invalid("Please enter your full name.");
        }
        if self.age == 0 || self.age > MAX_AGE {
            return invalid("Please enter a valid age.");
        }
        if self.gender.trim().is_empty() {
            return invalid("Please select a gender.");
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return invalid("Please enter a valid email address.");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return invalid("Password must be at least 6 characters.");
        }
        Ok(())
    }

    fn profile(&self) -> Profile {
        Profile {
            name: self.name.trim().to_string(),
            age: self.age,
            gender: self.gender.clone(),
            email: self.email.trim().to_string(),
        }
    }
}

/// What observers of the store see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Session,
    /// False until the first resolution has finished; nothing should render
    /// before that.
    pub resolved: bool,
    pub error: Option<SessionResolutionError>,
}

#[derive(Default)]
struct State {
    snapshot: SessionSnapshot,
    issued: u64,
}

/// Single writer of the session. Share it behind an `Rc`.
pub struct SessionStore<P, S> {
    provider: Rc<P>,
    profiles: Rc<S>,
    state: RefCell<State>,
    resolution: Mutex<()>,
    listeners: Listeners<SessionSnapshot>,
}

impl<P: IdentityProvider, S: ProfileStore> SessionStore<P, S> {
    pub fn new(provider: Rc<P>, profiles: Rc<S>) -> Self {
        Self {
            provider,
            profiles,
            state: RefCell::new(State::default()),
            resolution: Mutex::new(()),
            listeners: Listeners::new(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().snapshot.session.clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.state.borrow().snapshot.resolved
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().snapshot.session.is_authenticated()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionSnapshot) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Follows the provider's session changes for as long as the returned
    /// future is polled. Spawn it once at startup.
    pub async fn run(&self) {
        let mut changes = self.provider.observe_session_changes();
        while let Some(change) = changes.next().await {
            // Failures are recorded in the snapshot.
            let _ = self.apply_change(change).await;
        }
        log::debug!("Session change stream closed");
    }

    /// Resolves one session change. Resolutions run one at a time and only
    /// the most recently issued one may commit.
    pub async fn apply_change(
        &self,
        change: Option<Identity>,
    ) -> Result<(), SessionResolutionError> {
        let ticket = {
            let mut state = self.state.borrow_mut();
            state.issued += 1;
            state.issued
        };
        let _serialized = self.resolution.lock().await;

        if self.is_superseded(ticket) {
            log::debug!("Skipping superseded session change #{}", ticket);
            return Ok(());
        }

        let outcome = match &change {
            None => Ok(Session::absent()),
            Some(identity) => {
                log::debug!("Resolving session for {}", identity.uid);
                self.profiles
                    .read(identity)
                    .await
                    .map(|profile| Session::signed_in(identity.clone(), profile))
                    .map_err(SessionResolutionError::from)
            }
        };

        if self.is_superseded(ticket) {
            log::warn!("Dropping stale session resolution #{}", ticket);
            return Ok(());
        }

        let result = {
            let mut state = self.state.borrow_mut();
            state.snapshot.resolved = true;
            match outcome {
                Ok(session) => {
                    state.snapshot.session = session;
                    state.snapshot.error = None;
                    Ok(())
                }
                Err(e) => {
                    log::error!("Session resolution failed: {}", e);
                    state.snapshot.session = Session::absent();
                    state.snapshot.error = Some(e.clone());
                    Err(e)
                }
            }
        };

        self.listeners.notify(&self.snapshot());
        result
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.state.borrow().issued != ticket
    }

    /// Creates the account, then stores the profile. The two steps are not
    /// atomic: a failed profile write leaves an account without a profile.
    pub async fn register(&self, registration: &Registration) -> Result<Identity, RegistrationError> {
        registration.validate()?;

        let identity = self
            .provider
            .create_account(registration.email.trim(), &registration.password)
            .await
            .map_err(|e| {
                log::error!("Account creation failed: {}", e);
                RegistrationError::Account(e)
            })?;

        self.profiles
            .write(&identity, &registration.profile())
            .await
            .map_err(|e| {
                log::error!("Account {} has no profile: {}", identity.uid, e);
                RegistrationError::Profile(e)
            })?;

        // Re-resolve so the freshly written profile is picked up.
        if let Err(e) = self.apply_change(Some(identity.clone())).await {
            log::warn!("Registered {} but could not load the profile: {}", identity.uid, e);
        }
        Ok(identity)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), LoginError> {
        let identity = self.provider.sign_in(email.trim(), password).await.map_err(|e| {
            log::error!("Login failed: {}", e);
            LoginError(e)
        })?;

        if let Err(e) = self.apply_change(Some(identity)).await {
            log::warn!("Signed in but session resolution failed: {}", e);
        }
        Ok(())
    }

    /// Returns once the session is cleared, so callers may navigate away
    /// from protected views afterwards.
    pub async fn logout(&self) -> Result<(), LogoutError> {
        self.provider.sign_out().await.map_err(|e| {
            log::error!("Logout failed: {}", e);
            LogoutError(e)
        })?;
        // Clearing the session cannot fail.
        let _ = self.apply_change(None).await;
        Ok(())
    }

    /// Mints a fresh bearer credential for the signed-in user.
    pub async fn credential(&self) -> Result<Credential, AuthError> {
        let identity = self
            .state
            .borrow()
            .snapshot
            .session
            .identity()
            .cloned()
            .ok_or(AuthError::NotSignedIn)?;
        self.provider.mint_credential(&identity, true).await
    }
}

impl<P: IdentityProvider, S: ProfileStore> CredentialSource for SessionStore<P, S> {
    async fn bearer(&self) -> Result<Credential, AuthError> {
        self.credential().await
    }
}
