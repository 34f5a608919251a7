//! One-shot messages shown on the next login page.
//!
//! The cookie only ever carries a fixed code, never text, so nothing a client
//! sends back is rendered verbatim.

use axum::{
    extract::State,
    http::{
        HeaderMap, HeaderValue,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::Response,
};
use std::sync::Arc;

use super::{
    state::{AuthConfig, AuthState},
    utils::extract_cookie,
};

pub const FLASH_COOKIE_NAME: &str = "portal_flash";
const FLASH_MAX_AGE_SECONDS: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    LoggedOut,
    AuthFailed,
    Forbidden,
}

impl Flash {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::AuthFailed => "auth_failed",
            Self::Forbidden => "forbidden",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::LoggedOut => "You have been logged out successfully.",
            Self::AuthFailed => "Authentication failed. Please try again.",
            Self::Forbidden => "You don't have permission to access this resource.",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "logged_out" => Some(Self::LoggedOut),
            "auth_failed" => Some(Self::AuthFailed),
            "forbidden" => Some(Self::Forbidden),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        extract_cookie(headers, FLASH_COOKIE_NAME).and_then(|code| Self::from_code(&code))
    }

    /// Short-lived cookie that carries this flash to the next page.
    pub(crate) fn cookie(self, config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{FLASH_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={FLASH_MAX_AGE_SECONDS}",
            self.code()
        );
        if config.cookie_secure() {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// Expire a consumed flash cookie.
    pub(crate) fn clear_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{FLASH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if config.cookie_secure() {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Turn a [`Flash`] left in the response extensions into its cookie.
///
/// The error boundary has no access to [`AuthState`], so it parks the flash
/// on the response and this layer sets the cookie with the configured flags.
pub(crate) async fn attach_flash_cookie(
    State(auth_state): State<Arc<AuthState>>,
    mut response: Response,
) -> Response {
    if let Some(flash) = response.extensions_mut().remove::<Flash>()
        && let Ok(cookie) = flash.cookie(auth_state.config())
    {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
