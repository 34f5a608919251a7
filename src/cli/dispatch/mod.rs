//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, auth, negotiate};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let negotiate_opts = negotiate::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        secret_key: auth_opts.secret_key,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        cookie_secure: auth_opts.cookie_secure,
        remote_user_header: auth_opts.remote_user_header,
        negotiate_resolver_url: negotiate_opts.resolver_url,
        negotiate_timeout_seconds: negotiate_opts.timeout_seconds,
        negotiate_challenge: negotiate_opts.challenge,
        krb5_ktname: negotiate_opts.keytab,
    }))
}
