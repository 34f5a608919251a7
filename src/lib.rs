//! # Portal (dashboard portal behind a Kerberos-aware login wall)
//!
//! `portal` serves two embedded dashboard applications behind a session-based
//! login wall. Callers authenticate either with a Kerberos ticket carried in an
//! `Authorization: Negotiate` header, or through the `/login` form, where an
//! upstream reverse proxy has already validated the user and injected a trusted
//! identity header.
//!
//! ## Authentication Gate
//!
//! Every protected route runs the gate before its handler:
//!
//! - **Authenticated session:** the request is allowed without contacting the
//!   ticket resolver.
//! - **Negotiate header:** the token is handed to the configured resolver. A
//!   resolved principal authenticates the session; any failure is logged and the
//!   caller is redirected to `/login`.
//! - **Nothing offered:** the caller is redirected to `/login?next=<url>`.
//!
//! Ticket validation itself is never performed here. The resolver is an external
//! HTTP service, and its timeout comes from deployment configuration.
//!
//! ## Sessions
//!
//! Sessions live server-side and are keyed by a keyed SHA-256 digest of the
//! random id carried in the `portal_session` cookie. The id is rotated on every
//! login and the record is dropped on logout.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
