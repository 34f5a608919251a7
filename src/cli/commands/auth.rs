use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, builder::BoolishValueParser};
use secrecy::SecretString;

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_REMOTE_USER_HEADER: &str = "remote-user-header";

#[derive(Debug, Clone)]
pub struct Options {
    pub secret_key: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub remote_user_header: String,
}

impl Options {
    /// Parse session and login arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or empty.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret_key = matches
            .get_one::<String>(ARG_SECRET_KEY)
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_SECRET_KEY}"))?;

        let remote_user_header = matches
            .get_one::<String>(ARG_REMOTE_USER_HEADER)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_REMOTE_USER_HEADER}"))?;

        Ok(Self {
            secret_key: SecretString::from(secret_key),
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
            cookie_secure: matches
                .get_one::<bool>(ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(true),
            remote_user_header,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Secret used to key session id digests (at least 32 bytes)")
                .env("PORTAL_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("PORTAL_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark session cookies Secure (disable only for plain-http development)")
                .env("PORTAL_COOKIE_SECURE")
                .default_value("true")
                .num_args(0..=1)
                .default_missing_value("true")
                .action(ArgAction::Set)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_REMOTE_USER_HEADER)
                .long(ARG_REMOTE_USER_HEADER)
                .help("Header carrying the proxy-validated identity (user@REALM)")
                .env("PORTAL_REMOTE_USER_HEADER")
                .default_value("x-remote-user"),
        )
}
