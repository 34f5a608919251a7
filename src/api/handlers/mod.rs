//! Route handlers for the portal.
//!
//! `auth` holds the gate and the public login/logout endpoints, `pages` the
//! protected portal and dashboard entry points, `health` the public status check.

pub mod auth;
pub mod health;
pub mod pages;

use axum::{
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

/// `302 Found` redirect to a local path.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        // Locations are built from local paths; fall back to the portal root.
        Err(_) => (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static("/"))]).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_location() {
        let response = found("/login?next=/about");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("/login?next=/about")
        );
    }

    #[test]
    fn found_falls_back_on_invalid_location() {
        let response = found("/bad\nheader");
        assert_eq!(
            response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("/")
        );
    }
}
