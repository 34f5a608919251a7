//! Login form and the proxy-validated login endpoint.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, header::SET_COOKIE},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::IntoParams;

use super::{
    flash::Flash,
    principal::Principal,
    session::{Session, SessionId, session_cookie},
    state::AuthState,
    utils::safe_next,
};
use crate::api::{error::PortalError, handlers::found, views};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Local path to return to after login
    next: Option<String>,
}

#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses(
        (status = 200, description = "Login form", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
pub async fn login_form(
    Extension(auth_state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    let flash = Flash::from_headers(&headers);
    let next = safe_next(query.next.as_deref());

    let mut response = Html(views::login(flash, &next)).into_response();
    if flash.is_some()
        && let Ok(cookie) = Flash::clear_cookie(auth_state.config())
    {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

#[utoipa::path(
    post,
    path = "/login",
    params(LoginQuery),
    responses(
        (status = 302, description = "Redirect to `next` (or `/`) once the session is established, or back to `/login` without a trusted identity")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(auth_state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, PortalError> {
    let header = auth_state.config().remote_user_header();
    let Some(principal) = Principal::from_trusted_header(&headers, header) else {
        warn!("Login rejected: missing or invalid {header} header");
        return Err(PortalError::Unauthorized);
    };

    let previous = SessionId::from_headers(&headers);
    let id = auth_state
        .establish(previous.as_ref(), Session::for_principal(&principal))
        .await?;
    let cookie =
        session_cookie(auth_state.config(), &id).map_err(|err| PortalError::Internal(err.into()))?;

    info!("User {} successfully logged in", principal.username());

    let mut response = found(&safe_next(query.next.as_deref()));
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}
