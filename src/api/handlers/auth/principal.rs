//! Resolved user identities.
//!
//! A principal is only ever built from a trusted source: the ticket resolver's
//! answer or the identity header injected by the upstream proxy. Both carry a
//! Kerberos style `username@REALM` string and only the part before `@` is kept.

use axum::http::HeaderMap;
use regex::Regex;

/// Authenticated user identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    username: String,
}

impl Principal {
    /// Parse a trusted `username@REALM` identity, dropping the realm.
    ///
    /// Returns `None` when the username part is empty or contains whitespace,
    /// path separators or control characters.
    #[must_use]
    pub fn from_identity(identity: &str) -> Option<Self> {
        let username = identity.trim().split('@').next()?.trim();
        valid_username(username).then(|| Self {
            username: username.to_string(),
        })
    }

    /// Read the identity header set by the upstream authentication layer.
    #[must_use]
    pub fn from_trusted_header(headers: &HeaderMap, header: &str) -> Option<Self> {
        let value = headers.get(header)?.to_str().ok()?;
        Self::from_identity(value)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

fn valid_username(username: &str) -> bool {
    Regex::new(r"^[^\s@/\\[:cntrl:]]+$").is_ok_and(|re| re.is_match(username))
}
