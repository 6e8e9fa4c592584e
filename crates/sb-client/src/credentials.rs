//! Integration credentials.
//!
//! Values are redacted in `Debug` output so credentials can sit inside
//! instrumented structs without leaking into logs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Credentials for one integration: an optional base URL, an optional bearer
/// token and any number of named entries (`defaultSpaceId`, `apikey`, ...).
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    base_url: Option<String>,
    access_token: Option<String>,
    entries: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Credentials {
    /// Create credentials for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Set the bearer token sent by [`HttpTransport`](crate::HttpTransport).
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Add a named entry.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// The base URL, with any trailing slash removed.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// The base URL, or a configuration error if it is missing.
    pub fn require_base_url(&self) -> Result<&str> {
        self.base_url()
            .ok_or_else(|| Error::config("missing base url in integration credentials"))
    }

    /// The bearer token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Look up a named entry.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Look up a named entry, or fail with a configuration error.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::config(format!("missing credential entry: {}", name)))
    }
}
