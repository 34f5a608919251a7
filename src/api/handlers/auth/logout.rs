use axum::{
    extract::Extension,
    http::{HeaderMap, header::SET_COOKIE},
    response::Response,
};
use std::sync::Arc;
use tracing::{error, info};

use super::{
    flash::Flash,
    session::{SessionId, clear_session_cookie},
    state::AuthState,
};
use crate::api::handlers::found;

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Session cleared, redirect to the login form")
    ),
    tag = "auth"
)]
pub async fn logout(
    Extension(auth_state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Response {
    if let Some(id) = SessionId::from_headers(&headers) {
        match auth_state.current_session(Some(&id)).await {
            Ok(session) if session.is_authenticated() => {
                info!("User {} logged out", session.username());
            }
            Ok(_) => {}
            Err(err) => error!("Failed to load session: {err}"),
        }
        if let Err(err) = auth_state.sessions().remove(&id).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response = found("/login");
    for cookie in [
        clear_session_cookie(auth_state.config()),
        Flash::LoggedOut.cookie(auth_state.config()),
    ]
    .into_iter()
    .flatten()
    {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
