use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_DATABASE_URL: &str = "https://dr-detection-system-default-rtdb.firebaseio.com";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("FIREBASE_API_KEY is not set")]
    MissingApiKey,
}

/// Endpoints and keys the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub firebase_api_key: String,
    pub identity_url: String,
    pub token_url: String,
    pub database_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            firebase_api_key: String::new(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Builds a config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: String| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
        };
        let defaults = Self::default();

        Self {
            api_base_url: read("DR_API_URL", defaults.api_base_url),
            firebase_api_key: read("FIREBASE_API_KEY", defaults.firebase_api_key),
            identity_url: read("FIREBASE_IDENTITY_URL", defaults.identity_url),
            token_url: read("FIREBASE_TOKEN_URL", defaults.token_url),
            database_url: read("FIREBASE_DATABASE_URL", defaults.database_url),
        }
    }

    /// Values baked in at compile time, which is the only environment a wasm
    /// bundle has.
    pub fn from_build_env() -> Self {
        Self::from_lookup(|key| {
            let value = match key {
                "DR_API_URL" => option_env!("DR_API_URL"),
                "FIREBASE_API_KEY" => option_env!("FIREBASE_API_KEY"),
                "FIREBASE_IDENTITY_URL" => option_env!("FIREBASE_IDENTITY_URL"),
                "FIREBASE_TOKEN_URL" => option_env!("FIREBASE_TOKEN_URL"),
                "FIREBASE_DATABASE_URL" => option_env!("FIREBASE_DATABASE_URL"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }

    pub fn is_firebase_configured(&self) -> bool {
        !self.firebase_api_key.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("DR_API_URL", &self.api_base_url),
            ("FIREBASE_IDENTITY_URL", &self.identity_url),
            ("FIREBASE_TOKEN_URL", &self.token_url),
            ("FIREBASE_DATABASE_URL", &self.database_url),
        ];
        for (field, value) in urls {
            Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
                field,
                reason: e.to_string(),
            })?;
        }

        if !self.is_firebase_configured() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_keys_fall_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("FIREBASE_API_KEY", "key-123")]));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.firebase_api_key, "key-123");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = ClientConfig::from_lookup(lookup(&[("DR_API_URL", "   ")]));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn validate_reports_bad_urls_and_missing_key() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DR_API_URL", "not a url"),
            ("FIREBASE_API_KEY", "k"),
        ]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "DR_API_URL", .. })
        ));

        assert_eq!(
            ClientConfig::default().validate(),
            Err(ConfigError::MissingApiKey)
        );
    }
}
