//! Server-side sessions and the cookie that points at them.
//!
//! Flow Overview: the `portal_session` cookie carries a random id. Stores key
//! their records by a digest of that id mixed with the server secret, so a dump
//! of the store cannot be replayed as cookies. Writes are last-write-wins; the
//! only writes are "authenticate" and "clear".

use anyhow::Result;
use axum::http::{HeaderMap, HeaderValue, header::InvalidHeaderValue};
use secrecy::SecretString;
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use super::{
    principal::Principal,
    state::AuthConfig,
    utils::{extract_cookie, generate_session_id, hash_session_id},
};

pub const SESSION_COOKIE_NAME: &str = "portal_session";

/// Per-browser authentication state.
///
/// An authenticated session always carries a non-empty username: the only way
/// to build one is from a resolved [`Principal`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    username: String,
}

impl Session {
    #[must_use]
    pub fn for_principal(principal: &Principal) -> Self {
        Self {
            authenticated: true,
            username: principal.username().to_string(),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Opaque session identifier as carried by the cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random id.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        generate_session_id().map(Self)
    }

    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        extract_cookie(headers, SESSION_COOKIE_NAME).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionId(***)")
    }
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Storage backend for sessions.
pub trait SessionStore: Send + Sync {
    /// Load a live session; expired or unknown ids yield `None`.
    fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<Session>>;
    fn save<'a>(&'a self, id: &'a SessionId, session: Session) -> StoreFuture<'a, ()>;
    /// Remove a session; unknown ids are not an error.
    fn remove<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()>;
    /// Number of live sessions, reported by `/health`.
    fn active(&self) -> StoreFuture<'_, usize>;
}

struct StoredSession {
    session: Session,
    saved_at: Instant,
}

/// In-process session store with a fixed TTL per write.
pub struct MemorySessionStore {
    secret: SecretString,
    ttl: Duration,
    sessions: RwLock<HashMap<[u8; 32], StoredSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self {
            secret,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn key(&self, id: &SessionId) -> [u8; 32] {
        hash_session_id(&self.secret, id.as_str())
    }
}

impl SessionStore for MemorySessionStore {
    fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<Session>> {
        Box::pin(async move {
            let sessions = self.sessions.read().await;
            Ok(sessions
                .get(&self.key(id))
                .filter(|entry| entry.saved_at.elapsed() < self.ttl)
                .map(|entry| entry.session.clone()))
        })
    }

    fn save<'a>(&'a self, id: &'a SessionId, session: Session) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let key = self.key(id);
            let mut sessions = self.sessions.write().await;
            sessions.retain(|_, entry| entry.saved_at.elapsed() < self.ttl);
            sessions.insert(
                key,
                StoredSession {
                    session,
                    saved_at: Instant::now(),
                },
            );
            Ok(())
        })
    }

    fn remove<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let key = self.key(id);
            self.sessions.write().await.remove(&key);
            Ok(())
        })
    }

    fn active(&self) -> StoreFuture<'_, usize> {
        Box::pin(async move {
            let sessions = self.sessions.read().await;
            Ok(sessions
                .values()
                .filter(|entry| entry.saved_at.elapsed() < self.ttl)
                .count())
        })
    }
}

/// Build a `HttpOnly` cookie for the session id.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    id: &SessionId,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}",
        id.as_str()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
