//! HTTP error boundary.
//!
//! Handlers return [`PortalError`]; clients only ever see a login redirect with
//! a flash message or the generic error page. Details stay in the server log.
//! The flash is parked in the response extensions and turned into a cookie by
//! the router, which knows the cookie flags.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::any::Any;
use thiserror::Error;
use tracing::error;

use super::{
    handlers::{auth::flash::Flash, found},
    views,
};

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("authentication required")]
    Unauthorized,
    #[error("access forbidden")]
    Forbidden,
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => flash_redirect(Flash::AuthFailed),
            Self::Forbidden => flash_redirect(Flash::Forbidden),
            Self::Internal(err) => {
                error!("Server error: {err:#}");
                server_error()
            }
        }
    }
}

fn flash_redirect(flash: Flash) -> Response {
    let mut response = found("/login");
    response.extensions_mut().insert(flash);
    response
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(views::error_page())).into_response()
}

/// Render panics as the generic error page.
pub(crate) fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!("Handler panicked: {detail}");
    server_error()
}
