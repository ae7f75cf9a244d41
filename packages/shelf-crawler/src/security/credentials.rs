//! Database credentials held in secure memory.
//!
//! Uses the `secrecy` crate so the auth token never shows up in logs,
//! debug output, or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when building the request that needs it.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Connection details for the batch store.
#[derive(Clone)]
pub struct StoreCredentials {
    /// Database URL (`libsql://`, `https://`, `sqlite:` or `memory:`)
    pub url: String,

    /// Bearer token for remote databases
    pub auth_token: Option<SecretString>,
}

impl StoreCredentials {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(SecretString::new(token));
        self
    }

    /// Whether this URL points at a remote libSQL server.
    pub fn is_remote(&self) -> bool {
        ["libsql://", "https://", "http://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug() {
        let secret = SecretString::new("eyJhbGciOi-token");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("eyJ"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_secret_not_in_display() {
        let secret = SecretString::new("eyJhbGciOi-token");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn test_expose_works() {
        let secret = SecretString::new("eyJhbGciOi-token");
        assert_eq!(secret.expose(), "eyJhbGciOi-token");
    }

    #[test]
    fn test_store_credentials_debug() {
        let creds = StoreCredentials::new("libsql://shelf.turso.io").with_auth_token("eyJtoken");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("eyJtoken"));
        assert!(debug.contains("shelf.turso.io"));
        assert!(creds.is_remote());
        assert!(!StoreCredentials::new("sqlite:shelf.db").is_remote());
    }
}
