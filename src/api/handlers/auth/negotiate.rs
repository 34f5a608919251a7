//! Negotiate (SPNEGO) credentials and the ticket resolvers that validate them.
//!
//! Flow Overview: the gate extracts the opaque token from
//! `Authorization: Negotiate <token>` and hands it to a [`PrincipalResolver`].
//! Cryptographic ticket validation happens outside this process; the HTTP
//! resolver posts the token to a validation service and maps its answer to a
//! [`Principal`] or a typed [`ResolutionFailed`].
//!
//! Security boundaries: the token is wrapped in a `SecretString` and is never
//! formatted into logs or error messages.

use crate::APP_USER_AGENT;
use anyhow::{Context, Result, bail};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, pin::Pin, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use super::principal::Principal;

const NEGOTIATE_SCHEME: &str = "negotiate";

/// Opaque negotiation token taken from the `Authorization` header.
pub struct NegotiateToken(SecretString);

impl NegotiateToken {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self(SecretString::from(token.to_string()))
    }

    /// Extract a negotiate token; any other scheme counts as "not offered".
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case(NEGOTIATE_SCHEME) {
            return None;
        }
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self::new(token))
        }
    }
}

impl ExposeSecret<str> for NegotiateToken {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for NegotiateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NegotiateToken(***)")
    }
}

/// Why a negotiate token could not be turned into a principal.
#[derive(Debug, Error)]
pub enum ResolutionFailed {
    #[error("negotiate authentication is not configured")]
    Disabled,
    #[error("ticket rejected by resolver with status {0}")]
    Rejected(StatusCode),
    #[error("resolver returned an unusable principal")]
    Malformed,
    #[error("resolver unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
}

pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Principal, ResolutionFailed>> + Send + 'a>>;

/// Turns a negotiate token into a principal.
pub trait PrincipalResolver: Send + Sync {
    fn resolve<'a>(&'a self, token: &'a NegotiateToken) -> ResolveFuture<'a>;

    /// Short status string reported by `/health`.
    fn status(&self) -> &'static str;
}

/// Resolver used when no validation service is configured.
#[derive(Clone, Debug)]
pub struct DisabledResolver;

impl PrincipalResolver for DisabledResolver {
    fn resolve<'a>(&'a self, _token: &'a NegotiateToken) -> ResolveFuture<'a> {
        Box::pin(async { Err(ResolutionFailed::Disabled) })
    }

    fn status(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Serialize)]
struct TicketRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct TicketResponse {
    principal: String,
}

/// Resolver backed by an external ticket validation service.
///
/// `POST <url>` with `{"token": "..."}`; a 2xx answer carrying
/// `{"principal": "user@REALM"}` resolves the caller.
#[derive(Debug)]
pub struct HttpTicketResolver {
    url: Url,
    client: Client,
}

impl HttpTicketResolver {
    /// Build a resolver whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the URL is not http(s) or the HTTP client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid resolver URL: {url}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Resolver URL must use http or https: {url}");
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Error creating reqwest client")?;

        Ok(Self { url, client })
    }

    #[instrument(skip(self, token), fields(resolver = %self.url))]
    async fn resolve_ticket(&self, token: &NegotiateToken) -> Result<Principal, ResolutionFailed> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&TicketRequest {
                token: token.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionFailed::Rejected(status));
        }

        let body: TicketResponse = response
            .json()
            .await
            .map_err(|_| ResolutionFailed::Malformed)?;

        debug!("Resolver accepted ticket");

        Principal::from_identity(&body.principal).ok_or(ResolutionFailed::Malformed)
    }
}

impl PrincipalResolver for HttpTicketResolver {
    fn resolve<'a>(&'a self, token: &'a NegotiateToken) -> ResolveFuture<'a> {
        Box::pin(self.resolve_ticket(token))
    }

    fn status(&self) -> &'static str {
        "enabled"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderValue, routing::post};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn from_headers_extracts_negotiate_token() {
        let token = NegotiateToken::from_headers(&headers_with("Negotiate YIIGhgYJKoZIhvcS"));
        assert_eq!(
            token.as_ref().map(|token| token.expose_secret()),
            Some("YIIGhgYJKoZIhvcS")
        );
    }

    #[test]
    fn from_headers_matches_scheme_case_insensitively() {
        let token = NegotiateToken::from_headers(&headers_with("negotiate abc"));
        assert_eq!(token.as_ref().map(|token| token.expose_secret()), Some("abc"));
    }

    #[test]
    fn from_headers_ignores_other_schemes_and_empty_tokens() {
        assert!(NegotiateToken::from_headers(&headers_with("Bearer abc")).is_none());
        assert!(NegotiateToken::from_headers(&headers_with("Basic YWxpY2U6cHc=")).is_none());
        assert!(NegotiateToken::from_headers(&headers_with("Negotiate ")).is_none());
        assert!(NegotiateToken::from_headers(&headers_with("Negotiate")).is_none());
        assert!(NegotiateToken::from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let token = NegotiateToken::new("super-secret-ticket");
        assert!(!format!("{token:?}").contains("super-secret-ticket"));
    }

    #[test]
    fn http_resolver_rejects_non_http_urls() {
        assert!(HttpTicketResolver::new("ftp://kdc.example.com", Duration::from_secs(1)).is_err());
        assert!(HttpTicketResolver::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn disabled_resolver_always_fails() {
        let result = DisabledResolver.resolve(&NegotiateToken::new("abc")).await;
        assert!(matches!(result, Err(ResolutionFailed::Disabled)));
        assert_eq!(DisabledResolver.status(), "disabled");
    }

    async fn validate(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        match body.get("token").and_then(Value::as_str) {
            Some("good-ticket") => (
                StatusCode::OK,
                Json(json!({ "principal": "alice@EXAMPLE.COM" })),
            ),
            Some("odd-ticket") => (StatusCode::OK, Json(json!({ "principal": "@EXAMPLE.COM" }))),
            _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
        }
    }

    async fn spawn_validation_service() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/validate", post(validate));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/validate")
    }

    #[tokio::test]
    async fn http_resolver_maps_service_answers() {
        let url = spawn_validation_service().await;
        let resolver = HttpTicketResolver::new(&url, Duration::from_secs(5)).unwrap();
        assert_eq!(resolver.status(), "enabled");

        let principal = resolver.resolve(&NegotiateToken::new("good-ticket")).await;
        assert_eq!(
            principal.as_ref().map(Principal::username).ok(),
            Some("alice")
        );

        let rejected = resolver.resolve(&NegotiateToken::new("expired-ticket")).await;
        assert!(matches!(
            rejected,
            Err(ResolutionFailed::Rejected(StatusCode::UNAUTHORIZED))
        ));

        let malformed = resolver.resolve(&NegotiateToken::new("odd-ticket")).await;
        assert!(matches!(malformed, Err(ResolutionFailed::Malformed)));
    }

    #[tokio::test]
    async fn http_resolver_reports_unreachable_service() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let resolver =
            HttpTicketResolver::new(&format!("http://{addr}/validate"), Duration::from_secs(2))
                .unwrap();
        let result = resolver.resolve(&NegotiateToken::new("good-ticket")).await;
        assert!(matches!(result, Err(ResolutionFailed::Unavailable(_))));
    }
}
