//! Admission gate for protected routes.
//!
//! Flow Overview:
//! 1. An authenticated session is allowed as-is; the resolver is not consulted.
//! 2. Otherwise a `Negotiate` token, when offered, is resolved. A principal
//!    authenticates the session; a failure is logged and falls through.
//! 3. Callers that offered nothing may be challenged for a ticket when
//!    challenges are enabled.
//! 4. Everyone else is redirected to `/login` with the requested URL as `next`.
//!
//! The session is passed in and handed back, so the decision itself touches no
//! shared state. [`require_auth`] loads and persists it around the decision.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode, Uri,
        header::{SET_COOKIE, WWW_AUTHENTICATE},
    },
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    negotiate::{NegotiateToken, PrincipalResolver, ResolutionFailed},
    session::{Session, SessionId, session_cookie},
    state::AuthState,
    utils::login_location,
};
use crate::api::{error::PortalError, handlers::found, views};

/// Outcome of the gate for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    ChallengeNegotiate { next: String },
    RedirectToLogin { next: String },
}

/// What the gate looks at in a request.
#[derive(Debug)]
pub struct GateRequest {
    credential: Option<NegotiateToken>,
    next: String,
}

impl GateRequest {
    #[must_use]
    pub fn new(credential: Option<NegotiateToken>, next: impl Into<String>) -> Self {
        Self {
            credential,
            next: next.into(),
        }
    }

    #[must_use]
    pub fn from_parts(headers: &HeaderMap, uri: &Uri) -> Self {
        let next = uri
            .path_and_query()
            .map_or_else(|| uri.path(), |pq| pq.as_str());
        Self::new(NegotiateToken::from_headers(headers), next)
    }
}

/// Username of the caller admitted by the gate, available to protected handlers.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub String);

pub struct Gate<'a> {
    resolver: &'a dyn PrincipalResolver,
    challenge: bool,
}

impl<'a> Gate<'a> {
    #[must_use]
    pub fn new(resolver: &'a dyn PrincipalResolver, challenge: bool) -> Self {
        Self {
            resolver,
            challenge,
        }
    }

    /// Decide admission and return the session as it should be after this request.
    pub async fn evaluate(&self, request: GateRequest, session: Session) -> (AuthDecision, Session) {
        if session.is_authenticated() {
            return (AuthDecision::Allow, session);
        }

        let offered = request.credential.is_some();
        if let Some(token) = &request.credential {
            match self.resolver.resolve(token).await {
                Ok(principal) => {
                    info!("User {} authenticated via negotiate", principal.username());
                    return (AuthDecision::Allow, Session::for_principal(&principal));
                }
                Err(err @ ResolutionFailed::Unavailable(_)) => {
                    error!("Negotiate authentication failed: {err}");
                }
                Err(err @ ResolutionFailed::Disabled) => {
                    debug!("Negotiate authentication failed: {err}");
                }
                Err(err) => {
                    warn!("Negotiate authentication failed: {err}");
                }
            }
        }

        if self.challenge && !offered {
            return (
                AuthDecision::ChallengeNegotiate { next: request.next },
                session,
            );
        }

        (AuthDecision::RedirectToLogin { next: request.next }, session)
    }
}

/// Middleware guarding protected routes with the gate.
pub async fn require_auth(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let session_id = SessionId::from_headers(request.headers());
    let session = auth_state.current_session(session_id.as_ref()).await?;
    let was_authenticated = session.is_authenticated();

    let gate_request = GateRequest::from_parts(request.headers(), request.uri());
    let gate = Gate::new(
        auth_state.resolver(),
        auth_state.config().negotiate_challenge(),
    );
    let (decision, session) = gate.evaluate(gate_request, session).await;

    debug!("Gate decision for {}: {:?}", request.uri().path(), decision);

    match decision {
        AuthDecision::Allow => {
            let mut set_cookie = None;
            if !was_authenticated {
                // Fresh login through negotiate: rotate the id like a form login.
                let id = auth_state
                    .establish(session_id.as_ref(), session.clone())
                    .await?;
                set_cookie = Some(
                    session_cookie(auth_state.config(), &id)
                        .map_err(|err| PortalError::Internal(err.into()))?,
                );
            }

            request
                .extensions_mut()
                .insert(CurrentUser(session.username().to_string()));
            let mut response = next.run(request).await;
            if let Some(cookie) = set_cookie {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Ok(response)
        }
        AuthDecision::RedirectToLogin { next } => Ok(found(&login_location(&next))),
        AuthDecision::ChallengeNegotiate { next } => {
            let login = login_location(&next);
            Ok((
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"))],
                Html(views::negotiate_challenge(&login)),
            )
                .into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::{negotiate::ResolveFuture, principal::Principal};
    use super::*;
    use secrecy::ExposeSecret;
    use std::{
        io,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tracing_subscriber::fmt::MakeWriter;

    /// Resolver that accepts one ticket and counts every call.
    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl CountingResolver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PrincipalResolver for CountingResolver {
        fn resolve<'a>(&'a self, token: &'a NegotiateToken) -> ResolveFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if token.expose_secret() == "ticket-for-alice" {
                Principal::from_identity("alice@EXAMPLE.COM").ok_or(ResolutionFailed::Malformed)
            } else {
                Err(ResolutionFailed::Rejected(StatusCode::UNAUTHORIZED))
            };
            Box::pin(async move { result })
        }

        fn status(&self) -> &'static str {
            "enabled"
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn authenticated_session() -> Session {
        Session::for_principal(&Principal::from_identity("bob@EXAMPLE.COM").unwrap())
    }

    #[tokio::test]
    async fn authenticated_session_skips_resolver() {
        let resolver = CountingResolver::new();
        let gate = Gate::new(&resolver, false);
        let request = GateRequest::new(Some(NegotiateToken::new("ticket-for-alice")), "/dashboard");

        let (decision, session) = gate.evaluate(request, authenticated_session()).await;

        assert_eq!(decision, AuthDecision::Allow);
        assert_eq!(session.username(), "bob");
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn valid_ticket_authenticates_session() {
        let resolver = CountingResolver::new();
        let gate = Gate::new(&resolver, false);
        let request = GateRequest::new(Some(NegotiateToken::new("ticket-for-alice")), "/dashboard");

        let (decision, session) = gate.evaluate(request, Session::default()).await;

        assert_eq!(decision, AuthDecision::Allow);
        assert!(session.is_authenticated());
        assert_eq!(session.username(), "alice");
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_ticket_redirects_and_logs_without_token() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let resolver = CountingResolver::new();
        let gate = Gate::new(&resolver, false);
        let request = GateRequest::new(Some(NegotiateToken::new("expired-ticket-xyz")), "/about");

        let (decision, session) = gate.evaluate(request, Session::default()).await;

        assert_eq!(
            decision,
            AuthDecision::RedirectToLogin {
                next: "/about".to_string()
            }
        );
        assert_eq!(session, Session::default());
        assert_eq!(resolver.calls(), 1);

        let output = logs.contents();
        assert!(output.contains("Negotiate authentication failed"));
        assert!(!output.contains("expired-ticket-xyz"));
    }

    #[tokio::test]
    async fn no_credential_redirects_with_requested_url() {
        let resolver = CountingResolver::new();
        let gate = Gate::new(&resolver, false);
        let uri: Uri = "/dash/?region=North".parse().unwrap();
        let request = GateRequest::from_parts(&HeaderMap::new(), &uri);

        let (decision, _) = gate.evaluate(request, Session::default()).await;

        assert_eq!(
            decision,
            AuthDecision::RedirectToLogin {
                next: "/dash/?region=North".to_string()
            }
        );
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn challenge_only_when_nothing_offered() {
        let resolver = CountingResolver::new();
        let gate = Gate::new(&resolver, true);

        let (decision, _) = gate
            .evaluate(GateRequest::new(None, "/dashboard"), Session::default())
            .await;
        assert_eq!(
            decision,
            AuthDecision::ChallengeNegotiate {
                next: "/dashboard".to_string()
            }
        );

        // A rejected ticket must not loop back into another challenge.
        let request = GateRequest::new(Some(NegotiateToken::new("bad")), "/dashboard");
        let (decision, _) = gate.evaluate(request, Session::default()).await;
        assert_eq!(
            decision,
            AuthDecision::RedirectToLogin {
                next: "/dashboard".to_string()
            }
        );
    }
}
