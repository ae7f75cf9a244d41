//! Environment configuration.
//!
//! Loaded once at startup. Required values fail fast with the name of the
//! missing variable instead of letting a run start with half a config.

use dotenvy::dotenv;
use std::env;
use url::Url;

use crate::error::ConfigError;
use crate::security::credentials::StoreCredentials;

pub const GAMES_LIST_URL: &str = "GAMES_LIST_URL";
pub const DATABASE_URL: &str = "LIBSQL_DATABASE_URL";
pub const AUTH_TOKEN: &str = "LIBSQL_AUTH_TOKEN";

/// Settings needed to crawl the site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Sitemap prefix; page `n` lives at `{games_list_url}{n}.xml`
    pub games_list_url: String,
}

impl SiteConfig {
    /// Load from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let games_list_url = required(&lookup, GAMES_LIST_URL)?;
        Url::parse(&games_list_url).map_err(|e| ConfigError::Invalid {
            var: GAMES_LIST_URL,
            reason: e.to_string(),
        })?;
        Ok(Self { games_list_url })
    }
}

/// Settings needed to reach the batch store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub credentials: StoreCredentials,
}

impl StoreConfig {
    /// Load from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// The auth token is required for remote databases only.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = required(&lookup, DATABASE_URL)?;
        let mut credentials = StoreCredentials::new(url);

        if credentials.is_remote() {
            let token = required(&lookup, AUTH_TOKEN)?;
            credentials = credentials.with_auth_token(token);
        } else if let Some(token) = lookup(AUTH_TOKEN).filter(|t| !t.trim().is_empty()) {
            credentials = credentials.with_auth_token(token);
        }

        Ok(Self { credentials })
    }
}

/// Empty and whitespace-only values count as missing.
fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { var })
}
