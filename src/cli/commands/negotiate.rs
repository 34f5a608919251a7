use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, builder::BoolishValueParser};
use url::Url;

pub const ARG_RESOLVER_URL: &str = "negotiate-resolver-url";
pub const ARG_TIMEOUT_SECONDS: &str = "negotiate-timeout-seconds";
pub const ARG_CHALLENGE: &str = "negotiate-challenge";
pub const ARG_KRB5_KTNAME: &str = "krb5-ktname";

#[derive(Debug, Clone)]
pub struct Options {
    /// Ticket resolver endpoint; `None` disables negotiate authentication.
    pub resolver_url: Option<Url>,
    pub timeout_seconds: u64,
    pub challenge: bool,
    pub keytab: String,
}

impl Options {
    /// Parse negotiate arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the resolver URL is not a valid http(s) URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let resolver_url = matches
            .get_one::<String>(ARG_RESOLVER_URL)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| {
                Url::parse(value).with_context(|| format!("invalid --{ARG_RESOLVER_URL}: {value}"))
            })
            .transpose()?;

        if let Some(url) = &resolver_url
            && !matches!(url.scheme(), "http" | "https")
        {
            anyhow::bail!("--{ARG_RESOLVER_URL} must use http or https: {url}");
        }

        Ok(Self {
            resolver_url,
            timeout_seconds: matches
                .get_one::<u64>(ARG_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5),
            challenge: matches.get_one::<bool>(ARG_CHALLENGE).copied().unwrap_or(false),
            keytab: matches
                .get_one::<String>(ARG_KRB5_KTNAME)
                .cloned()
                .unwrap_or_else(|| "/etc/krb5.keytab".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RESOLVER_URL)
                .long(ARG_RESOLVER_URL)
                .help("Ticket resolver URL; negotiate authentication is disabled when unset")
                .env("PORTAL_NEGOTIATE_RESOLVER_URL"),
        )
        .arg(
            Arg::new(ARG_TIMEOUT_SECONDS)
                .long(ARG_TIMEOUT_SECONDS)
                .help("Timeout for ticket resolver calls in seconds")
                .env("PORTAL_NEGOTIATE_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_CHALLENGE)
                .long(ARG_CHALLENGE)
                .help("Answer credential-less requests with 401 WWW-Authenticate: Negotiate")
                .env("PORTAL_NEGOTIATE_CHALLENGE")
                .default_value("false")
                .num_args(0..=1)
                .default_missing_value("true")
                .action(ArgAction::Set)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_KRB5_KTNAME)
                .long(ARG_KRB5_KTNAME)
                .help("Service keytab that must exist when negotiate authentication is enabled")
                .env("KRB5_KTNAME")
                .default_value("/etc/krb5.keytab"),
        )
}
