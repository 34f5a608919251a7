use crate::{
    api::{
        self,
        handlers::auth::{
            AuthConfig, AuthState, DisabledResolver, HttpTicketResolver, MemorySessionStore,
            PrincipalResolver,
        },
    },
    cli::telemetry,
};
use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};
use std::{path::Path, sync::Arc, time::Duration};
use tracing::info;
use url::Url;

const MIN_SECRET_KEY_BYTES: usize = 32;

pub struct Args {
    pub port: u16,
    pub secret_key: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub remote_user_header: String,
    pub negotiate_resolver_url: Option<Url>,
    pub negotiate_timeout_seconds: u64,
    pub negotiate_challenge: bool,
    pub krb5_ktname: String,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("secret_key", &"[REDACTED]")
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("cookie_secure", &self.cookie_secure)
            .field("remote_user_header", &self.remote_user_header)
            .field("negotiate_resolver_url", &self.negotiate_resolver_url)
            .field("negotiate_timeout_seconds", &self.negotiate_timeout_seconds)
            .field("negotiate_challenge", &self.negotiate_challenge)
            .field("krb5_ktname", &self.krb5_ktname)
            .finish()
    }
}

/// `KRB5_KTNAME` may carry a `FILE:` residual type prefix.
fn keytab_path(ktname: &str) -> &Path {
    Path::new(ktname.strip_prefix("FILE:").unwrap_or(ktname))
}

/// Build the resolver; a configured resolver without a readable keytab is a startup error.
fn build_resolver(args: &Args) -> Result<Arc<dyn PrincipalResolver>> {
    let Some(url) = &args.negotiate_resolver_url else {
        info!("Negotiate authentication disabled, login form only");
        return Ok(Arc::new(DisabledResolver));
    };

    let keytab = keytab_path(&args.krb5_ktname);
    if !keytab.is_file() {
        bail!(
            "Negotiate authentication is enabled but keytab {} does not exist",
            keytab.display()
        );
    }

    let resolver = HttpTicketResolver::new(
        url.as_str(),
        Duration::from_secs(args.negotiate_timeout_seconds),
    )?;
    info!("Negotiate authentication enabled, resolver: {}", url);

    Ok(Arc::new(resolver))
}

fn build_state(args: Args) -> Result<Arc<AuthState>> {
    if args.secret_key.expose_secret().len() < MIN_SECRET_KEY_BYTES {
        bail!("--secret-key must be at least {MIN_SECRET_KEY_BYTES} bytes");
    }

    let resolver = build_resolver(&args)?;

    let config = AuthConfig::new(args.secret_key)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_cookie_secure(args.cookie_secure)
        .with_remote_user_header(args.remote_user_header)
        .with_negotiate_challenge(args.negotiate_challenge);

    let sessions = Arc::new(MemorySessionStore::new(
        config.secret_key().clone(),
        config.session_ttl(),
    ));

    Ok(Arc::new(AuthState::new(config, sessions, resolver)))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let auth_state = build_state(args)?;

    let result = api::new(port, auth_state).await;

    telemetry::shutdown_tracer();

    result
}
