use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Project identifier of the hosted backend. Compiled in, never read from the environment.
pub const PROJECT_ID: &str = "clariasense";

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {0} is empty")]
    Empty(&'static str),

    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("PORT must be a number, got {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub firebase: FirebaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub database_url: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
    pub firestore_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            let value = lookup(name).ok_or(ConfigError::Missing(name))?;
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
            Ok(value.trim().to_string())
        };

        let database_url = required("DATABASE_URL")?;
        if !FirebaseConfig::is_memory_url(&database_url) && reqwest::Url::parse(&database_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                name: "DATABASE_URL",
                value: database_url,
            });
        }

        let firestore_base_url = lookup("FIRESTORE_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string());
        if reqwest::Url::parse(&firestore_base_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                name: "FIRESTORE_BASE_URL",
                value: firestore_base_url,
            });
        }

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => 8080,
        };

        Ok(Config {
            firebase: FirebaseConfig {
                api_key: required("API_KEY")?,
                auth_domain: required("AUTH_DOMAIN")?,
                database_url,
                project_id: PROJECT_ID.to_string(),
                storage_bucket: required("STORAGE_BUCKET")?,
                messaging_sender_id: required("MESSAGING_SENDER_ID")?,
                app_id: required("APP_ID")?,
                measurement_id: required("MEASUREMENT_ID")?,
                firestore_base_url: firestore_base_url.trim_end_matches('/').to_string(),
            },
            server: ServerConfig {
                bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
        })
    }
}

impl FirebaseConfig {
    pub fn is_memory_url(url: &str) -> bool {
        url.starts_with("memory://")
    }

    pub fn uses_memory_backend(&self) -> bool {
        Self::is_memory_url(&self.database_url)
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        [
            ("API_KEY", "key-123"),
            ("AUTH_DOMAIN", "clariasense.firebaseapp.com"),
            ("DATABASE_URL", "https://clariasense-default-rtdb.firebaseio.com"),
            ("STORAGE_BUCKET", "clariasense.appspot.com"),
            ("MESSAGING_SENDER_ID", "1234"),
            ("APP_ID", "1:1234:web:abcd"),
            ("MEASUREMENT_ID", "G-XYZ"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    #[test]
    fn test_loads_complete_environment() {
        let env = full_env();
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.firebase.project_id, "clariasense");
        assert_eq!(config.firebase.api_key, "key-123");
        assert_eq!(config.firebase.firestore_base_url, DEFAULT_FIRESTORE_BASE_URL);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert!(!config.firebase.uses_memory_backend());
    }

    #[test]
    fn test_missing_variable_is_fatal() {
        let mut env = full_env();
        env.remove("APP_ID");
        let err = Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("APP_ID"));
    }

    #[test]
    fn test_blank_variable_is_rejected() {
        let mut env = full_env();
        env.insert("API_KEY", "   ".to_string());
        let err = Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Empty("API_KEY"));
    }

    #[test]
    fn test_malformed_database_url() {
        let mut env = full_env();
        env.insert("DATABASE_URL", "not a url".to_string());
        let err = Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { name: "DATABASE_URL", .. }));
    }

    #[test]
    fn test_memory_backend_and_overrides() {
        let mut env = full_env();
        env.insert("DATABASE_URL", "memory://demo".to_string());
        env.insert("PORT", "3000".to_string());
        env.insert("FIRESTORE_BASE_URL", "http://localhost:8081/v1/".to_string());
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert!(config.firebase.uses_memory_backend());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.firebase.firestore_base_url, "http://localhost:8081/v1");
    }

    #[test]
    fn test_bad_port() {
        let mut env = full_env();
        env.insert("PORT", "eighty".to_string());
        let err = Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("eighty".to_string()));
    }
}
