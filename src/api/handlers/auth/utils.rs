//! Small helpers for session ids, cookies and redirect targets.

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Create a new random session id for the session cookie.
/// The raw value is only returned to set the cookie; the store keeps a digest.
pub(crate) fn generate_session_id() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session id")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Digest a session id with the server secret so raw ids never sit in the store.
pub(crate) fn hash_session_id(secret: &SecretString, id: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    hasher.update([0u8]);
    hasher.update(id.as_bytes());
    hasher.finalize().into()
}

/// Find a cookie value by name in the `Cookie` header.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(axum::http::header::COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name && !val.trim().is_empty() {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

/// Keep `next` only when it is a local absolute path; anything else lands on `/`.
pub(crate) fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Build `/login?next=<path>`, escaping only what would break the query value.
pub(crate) fn login_location(next: &str) -> String {
    let mut location = String::from("/login?next=");
    for byte in next.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~/:@!$'()*,;".contains(&byte) {
            location.push(char::from(byte));
        } else {
            location.push_str(&format!("%{byte:02X}"));
        }
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn generate_session_id_is_random_and_url_safe() {
        let first = generate_session_id().ok();
        let second = generate_session_id().ok();
        assert!(first.is_some());
        assert_ne!(first, second);
        let decoded = first
            .as_deref()
            .and_then(|id| Base64UrlUnpadded::decode_vec(id).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded, Some(32));
    }

    #[test]
    fn hash_session_id_depends_on_secret_and_id() {
        let secret = SecretString::from("secret-one".to_string());
        let other_secret = SecretString::from("secret-two".to_string());
        assert_eq!(
            hash_session_id(&secret, "id"),
            hash_session_id(&secret, "id")
        );
        assert_ne!(
            hash_session_id(&secret, "id"),
            hash_session_id(&secret, "other")
        );
        assert_ne!(
            hash_session_id(&secret, "id"),
            hash_session_id(&other_secret, "id")
        );
    }

    #[test]
    fn extract_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; portal_session=abc123; other=1"),
        );
        assert_eq!(
            extract_cookie(&headers, "portal_session"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn extract_cookie_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("portal_session="),
        );
        assert_eq!(extract_cookie(&headers, "portal_session"), None);
    }

    #[test]
    fn safe_next_keeps_local_paths() {
        assert_eq!(safe_next(Some("/about")), "/about");
        assert_eq!(safe_next(Some("/dash/?tab=sales")), "/dash/?tab=sales");
    }

    #[test]
    fn safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(None), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
    }

    #[test]
    fn login_location_keeps_paths_readable() {
        assert_eq!(login_location("/dashboard"), "/login?next=/dashboard");
        assert_eq!(
            login_location("/dash/?a=1&b=2"),
            "/login?next=/dash/%3Fa%3D1%26b%3D2"
        );
    }
}
