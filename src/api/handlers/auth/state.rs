//! Auth state and configuration.

use anyhow::Result;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

use super::{
    negotiate::PrincipalResolver,
    session::{Session, SessionId, SessionStore},
};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_REMOTE_USER_HEADER: &str = "x-remote-user";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret_key: SecretString,
    session_ttl_seconds: u64,
    cookie_secure: bool,
    remote_user_header: String,
    negotiate_challenge: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: true,
            remote_user_header: DEFAULT_REMOTE_USER_HEADER.to_string(),
            negotiate_challenge: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_remote_user_header(mut self, header: String) -> Self {
        self.remote_user_header = header.to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn with_negotiate_challenge(mut self, enabled: bool) -> Self {
        self.negotiate_challenge = enabled;
        self
    }

    #[must_use]
    pub fn secret_key(&self) -> &SecretString {
        &self.secret_key
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn remote_user_header(&self) -> &str {
        &self.remote_user_header
    }

    #[must_use]
    pub fn negotiate_challenge(&self) -> bool {
        self.negotiate_challenge
    }
}

pub struct AuthState {
    config: AuthConfig,
    sessions: Arc<dyn SessionStore>,
    resolver: Arc<dyn PrincipalResolver>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        sessions: Arc<dyn SessionStore>,
        resolver: Arc<dyn PrincipalResolver>,
    ) -> Self {
        Self {
            config,
            sessions,
            resolver,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    #[must_use]
    pub fn resolver(&self) -> &dyn PrincipalResolver {
        self.resolver.as_ref()
    }

    /// Load the caller's session, or an anonymous one when the cookie is absent or stale.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn current_session(&self, id: Option<&SessionId>) -> Result<Session> {
        match id {
            Some(id) => Ok(self.sessions.load(id).await?.unwrap_or_default()),
            None => Ok(Session::default()),
        }
    }

    /// Persist an authenticated session under a fresh id, dropping the previous one.
    ///
    /// # Errors
    /// Returns an error if id generation or the store fails.
    pub async fn establish(
        &self,
        previous: Option<&SessionId>,
        session: Session,
    ) -> Result<SessionId> {
        if let Some(previous) = previous {
            self.sessions.remove(previous).await?;
        }
        let id = SessionId::generate()?;
        self.sessions.save(&id, session).await?;
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::{
        negotiate::DisabledResolver, principal::Principal, session::MemorySessionStore,
    };
    use super::*;

    fn auth_state() -> AuthState {
        let config = AuthConfig::new(SecretString::from("k".repeat(32)));
        let sessions = Arc::new(MemorySessionStore::new(
            config.secret_key().clone(),
            config.session_ttl(),
        ));
        AuthState::new(config, sessions, Arc::new(DisabledResolver))
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new(SecretString::from("k".repeat(32)));
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert!(config.cookie_secure());
        assert_eq!(config.remote_user_header(), DEFAULT_REMOTE_USER_HEADER);
        assert!(!config.negotiate_challenge());

        let config = config
            .with_session_ttl_seconds(60)
            .with_cookie_secure(false)
            .with_remote_user_header("X-Forwarded-User".to_string())
            .with_negotiate_challenge(true);

        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert!(!config.cookie_secure());
        assert_eq!(config.remote_user_header(), "x-forwarded-user");
        assert!(config.negotiate_challenge());
    }

    #[tokio::test]
    async fn current_session_defaults_to_anonymous() {
        let state = auth_state();
        let session = state.current_session(None).await.unwrap();
        assert!(!session.is_authenticated());

        let unknown = SessionId::generate().unwrap();
        let session = state.current_session(Some(&unknown)).await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn establish_rotates_session_id() {
        let state = auth_state();
        let alice = Session::for_principal(&Principal::from_identity("alice@EXAMPLE.COM").unwrap());

        let first = state.establish(None, alice.clone()).await.unwrap();
        let second = state.establish(Some(&first), alice).await.unwrap();
        assert_ne!(first, second);

        let old = state.current_session(Some(&first)).await.unwrap();
        assert!(!old.is_authenticated());
        let current = state.current_session(Some(&second)).await.unwrap();
        assert_eq!(current.username(), "alice");
    }
}
