use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;

use super::error_message;
use super::storage::KeyValueStore;
use crate::config::ClientConfig;
use crate::identity::{
    AuthError, Credential, Identity, IdentityProvider, SessionBroadcast, SessionChanges,
};
use crate::transport::{ApiRequest, HttpTransport, endpoint};

pub const SESSION_STORAGE_KEY: &str = "firebase_session";

/// Cached ID tokens this close to expiry are refreshed instead of reused.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    identity: Identity,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS))
            .is_some_and(|refresh_at| refresh_at > now)
    }
}

/// Absolute expiry for an `expiresIn` lifetime in seconds. Lifetimes that do
/// not fit a timestamp are rejected rather than wrapped.
fn expiry_after(now: DateTime<Utc>, expires_in: u64) -> Result<DateTime<Utc>, AuthError> {
    i64::try_from(expires_in)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AuthError::Malformed(format!("token lifetime {}s is out of range", expires_in)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(deserialize_with = "shared::de::u64_or_string")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
    #[serde(deserialize_with = "shared::de::u64_or_string")]
    expires_in: u64,
}

/// Email/password sign-in against the Identity Toolkit REST API.
pub struct FirebaseAuth<T, K> {
    transport: T,
    storage: K,
    api_key: String,
    identity_url: String,
    token_url: String,
    current: RefCell<Option<StoredSession>>,
    broadcast: SessionBroadcast,
}

impl<T: HttpTransport, K: KeyValueStore> FirebaseAuth<T, K> {
    /// Restores a persisted sign-in if one exists.
    pub fn new(config: &ClientConfig, transport: T, storage: K) -> Self {
        let restored = storage.get(SESSION_STORAGE_KEY).and_then(|raw| {
            match serde_json::from_str::<StoredSession>(&raw) {
                Ok(session) => {
                    log::info!("Restored sign-in for {}", session.identity.uid);
                    Some(session)
                }
                Err(e) => {
                    log::warn!("Discarding unreadable persisted sign-in: {}", e);
                    storage.remove(SESSION_STORAGE_KEY);
                    None
                }
            }
        });

        Self {
            transport,
            storage,
            api_key: config.firebase_api_key.clone(),
            identity_url: config.identity_url.clone(),
            token_url: config.token_url.clone(),
            current: RefCell::new(restored),
            broadcast: SessionBroadcast::new(),
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.current
            .borrow()
            .as_ref()
            .map(|session| session.identity.clone())
    }

    async fn password_flow(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let url = endpoint(&self.identity_url, &[method], &[("key", &self.api_key)])?;
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self.transport.send(ApiRequest::post(url, body)).await?;
        if !response.is_success() {
            let error = provider_error(response.status, &error_message(&response));
            log::error!("{} failed: {}", method, error);
            return Err(error);
        }

        let parsed: PasswordResponse = response
            .json()
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let expires_at = expiry_after(Utc::now(), parsed.expires_in)?;
        let identity = Identity {
            uid: parsed.local_id,
            email: parsed.email.or_else(|| Some(email.to_string())),
        };

        self.store(StoredSession {
            identity: identity.clone(),
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at,
        });
        log::info!("Signed in {} via {}", identity.uid, method);
        self.broadcast.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn refresh(&self, session: &StoredSession) -> Result<StoredSession, AuthError> {
        let url = endpoint(&self.token_url, &["token"], &[("key", &self.api_key)])?;
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": session.refresh_token,
        });

        let response = self.transport.send(ApiRequest::post(url, body)).await?;
        if !response.is_success() {
            return Err(provider_error(response.status, &error_message(&response)));
        }

        let parsed: RefreshResponse = response
            .json()
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        if parsed.user_id != session.identity.uid {
            return Err(AuthError::Malformed(format!(
                "token refresh returned user {} for {}",
                parsed.user_id, session.identity.uid
            )));
        }

        Ok(StoredSession {
            identity: session.identity.clone(),
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at: expiry_after(Utc::now(), parsed.expires_in)?,
        })
    }

    fn store(&self, session: StoredSession) {
        match serde_json::to_string(&session) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(SESSION_STORAGE_KEY, &raw) {
                    log::warn!("Sign-in will not survive a reload: {}", e);
                }
            }
            Err(e) => log::warn!("Could not serialize sign-in: {}", e),
        }
        *self.current.borrow_mut() = Some(session);
    }

    fn clear(&self) {
        self.current.borrow_mut().take();
        self.storage.remove(SESSION_STORAGE_KEY);
    }
}

impl<T: HttpTransport, K: KeyValueStore> IdentityProvider for FirebaseAuth<T, K> {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.password_flow("accounts:signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.password_flow("accounts:signInWithPassword", email, password)
            .await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(identity) = self.current_identity() {
            log::info!("Signing out {}", identity.uid);
        }
        self.clear();
        self.broadcast.publish(None);
        Ok(())
    }

    fn observe_session_changes(&self) -> SessionChanges {
        self.broadcast.subscribe(self.current_identity())
    }

    async fn mint_credential(
        &self,
        identity: &Identity,
        force_refresh: bool,
    ) -> Result<Credential, AuthError> {
        let session = self
            .current
            .borrow()
            .clone()
            .filter(|session| session.identity.uid == identity.uid)
            .ok_or(AuthError::NotSignedIn)?;

        if !force_refresh && session.is_fresh(Utc::now()) {
            return Ok(Credential::new(session.id_token));
        }

        match self.refresh(&session).await {
            Ok(fresh) => {
                let still_current = self
                    .current_identity()
                    .is_some_and(|current| current.uid == identity.uid);
                if !still_current {
                    return Err(AuthError::NotSignedIn);
                }
                let credential = Credential::new(fresh.id_token.clone());
                self.store(fresh);
                Ok(credential)
            }
            Err(AuthError::SessionRevoked(reason)) => {
                log::warn!("Sign-in for {} was revoked: {}", identity.uid, reason);
                self.clear();
                self.broadcast.publish(None);
                Err(AuthError::SessionRevoked(reason))
            }
            Err(e) => {
                log::error!("Token refresh failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Maps Identity Toolkit / Secure Token error codes onto `AuthError`.
/// Codes sometimes carry a detail: `WEAK_PASSWORD : Password should be ...`.
fn provider_error(status: u16, message: &str) -> AuthError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };

    match code {
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
        | "INVALID_EMAIL" => AuthError::InvalidCredentials,
        "WEAK_PASSWORD" => AuthError::WeakPassword(if detail.is_empty() {
            "password is too weak".to_string()
        } else {
            detail.to_string()
        }),
        "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" => {
            AuthError::SessionRevoked(code.to_string())
        }
        _ => AuthError::Provider {
            status,
            message: message.to_string(),
        },
    }
}
