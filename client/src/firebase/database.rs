use serde_json::Value;
use shared::{Profile, ProfileRecord};
use std::rc::Rc;

use super::error_message;
use crate::config::ClientConfig;
use crate::identity::{Identity, IdentityProvider, ProfileError, ProfileStore};
use crate::transport::{ApiRequest, HttpTransport, endpoint};

/// Profiles under `users/{uid}` in the Realtime Database, authorized with the
/// signed-in user's ID token.
pub struct RealtimeDatabase<T, A> {
    transport: T,
    auth: Rc<A>,
    database_url: String,
}

impl<T: HttpTransport, A: IdentityProvider> RealtimeDatabase<T, A> {
    pub fn new(config: &ClientConfig, transport: T, auth: Rc<A>) -> Self {
        Self {
            transport,
            auth,
            database_url: config.database_url.clone(),
        }
    }

    async fn profile_url(&self, identity: &Identity) -> Result<String, ProfileError> {
        let token = self.auth.mint_credential(identity, false).await?;
        let document = format!("{}.json", identity.uid);
        Ok(endpoint(
            &self.database_url,
            &["users", &document],
            &[("auth", token.as_str())],
        )?)
    }
}

impl<T: HttpTransport, A: IdentityProvider> ProfileStore for RealtimeDatabase<T, A> {
    async fn write(&self, identity: &Identity, profile: &Profile) -> Result<(), ProfileError> {
        let url = self.profile_url(identity).await?;
        let record = ProfileRecord {
            uid: Some(identity.uid.clone()),
            profile: profile.clone(),
        };
        let body =
            serde_json::to_value(&record).map_err(|e| ProfileError::Malformed(e.to_string()))?;

        let response = self.transport.send(ApiRequest::put(url, body)).await?;
        if !response.is_success() {
            return Err(ProfileError::Rejected {
                status: response.status,
                message: error_message(&response),
            });
        }
        log::debug!("Stored profile for {}", identity.uid);
        Ok(())
    }

    async fn read(&self, identity: &Identity) -> Result<Option<Profile>, ProfileError> {
        let url = self.profile_url(identity).await?;
        let response = self.transport.send(ApiRequest::get(url)).await?;
        if !response.is_success() {
            return Err(ProfileError::Rejected {
                status: response.status,
                message: error_message(&response),
            });
        }

        let value: Value = response
            .json()
            .map_err(|e| ProfileError::Malformed(e.to_string()))?;
        if value.is_null() {
            log::debug!("No profile stored for {}", identity.uid);
            return Ok(None);
        }

        let record: ProfileRecord =
            serde_json::from_value(value).map_err(|e| ProfileError::Malformed(e.to_string()))?;
        Ok(Some(record.profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AuthError;
    use crate::testing::{FakeProvider, FakeTransport};
    use crate::transport::Method;
    use futures::executor::block_on;

    fn setup() -> (Rc<FakeTransport>, RealtimeDatabase<Rc<FakeTransport>, FakeProvider>, Identity) {
        let transport = Rc::new(FakeTransport::new());
        let provider = Rc::new(FakeProvider::new());
        let identity = provider.add_account("u1", "ada@example.com");
        let config = ClientConfig {
            database_url: "https://db.example.com".to_string(),
            ..ClientConfig::default()
        };
        let database = RealtimeDatabase::new(&config, Rc::clone(&transport), provider);
        (transport, database, identity)
    }

    fn profile() -> Profile {
        Profile {
            name: "Ada Lovelace".to_string(),
            age: 36,
            gender: "Female".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn write_puts_record_with_uid() {
        let (transport, database, identity) = setup();
        transport.reply(200, "{}");

        block_on(database.write(&identity, &profile())).unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Put);
        assert!(request.url.starts_with("https://db.example.com/users/u1.json?auth="));
        let body = request.body.as_ref().unwrap();
        assert_eq!(body["uid"], "u1");
        assert_eq!(body["age"], 36);
    }

    #[test]
    fn read_maps_null_to_absent() {
        let (transport, database, identity) = setup();
        transport.reply(200, "null");
        assert_eq!(block_on(database.read(&identity)), Ok(None));
    }

    #[test]
    fn read_parses_record_written_by_older_clients() {
        let (transport, database, identity) = setup();
        transport.reply(
            200,
            r#"{"uid":"u1","name":"Ada Lovelace","age":"36","gender":"Female","email":"ada@example.com"}"#,
        );
        assert_eq!(block_on(database.read(&identity)), Ok(Some(profile())));
    }

    #[test]
    fn rejection_carries_database_message() {
        let (transport, database, identity) = setup();
        transport.reply(401, r#"{"error":"Permission denied"}"#);
        assert_eq!(
            block_on(database.read(&identity)),
            Err(ProfileError::Rejected {
                status: 401,
                message: "Permission denied".to_string()
            })
        );
    }

    #[test]
    fn signed_out_identity_cannot_read() {
        let (transport, database, _) = setup();
        let stranger = Identity {
            uid: "ghost".to_string(),
            email: None,
        };
        assert_eq!(
            block_on(database.read(&stranger)),
            Err(ProfileError::Credential(AuthError::NotSignedIn))
        );
        assert!(transport.requests().is_empty());
    }
}
