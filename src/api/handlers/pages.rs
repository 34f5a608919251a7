//! Protected portal pages and the dashboard mounts.
//!
//! Every handler here sits behind [`require_auth`](super::auth::require_auth)
//! and can rely on the [`CurrentUser`] extension being present.

use axum::{
    extract::Extension,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

use super::{auth::CurrentUser, found};
use crate::api::views;

/// Dashboard application mounted under a path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardApp {
    pub name: &'static str,
    pub mount: &'static str,
    pub description: &'static str,
}

pub const DASHBOARDS: [DashboardApp; 3] = [
    DashboardApp {
        name: "Dash Dashboard",
        mount: "/dash/",
        description: "Interactive charts and data tables.",
    },
    DashboardApp {
        name: "Taipy Dashboard",
        mount: "/taipy1/",
        description: "Taipy application overview.",
    },
    DashboardApp {
        name: "Taipy Charts",
        mount: "/taipy2/",
        description: "Taipy charting pages.",
    },
];

/// Dashboard owning `path`, matched on the mount prefix (with or without trailing slash).
#[must_use]
pub fn mounted_app(path: &str) -> Option<&'static DashboardApp> {
    DASHBOARDS.iter().find(|app| {
        path.starts_with(app.mount) || path == app.mount.trim_end_matches('/')
    })
}

pub async fn index(Extension(user): Extension<CurrentUser>) -> Html<String> {
    Html(views::index(&user.0, &DASHBOARDS))
}

pub async fn about(Extension(user): Extension<CurrentUser>) -> Html<String> {
    Html(views::about(&user.0))
}

pub async fn dash_dashboard() -> Response {
    found("/dash/")
}

pub async fn taipy_dashboard() -> Response {
    found("/taipy1/")
}

/// Shell page for a mounted dashboard; the app renders its own content client side.
pub async fn dashboard_app(uri: Uri, Extension(user): Extension<CurrentUser>) -> Response {
    let path = uri.path();
    match mounted_app(path) {
        Some(app) => {
            debug!("Serving {} for {}", app.name, path);
            Html(views::dashboard(app, &user.0, path)).into_response()
        }
        None => not_found().await.into_response(),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(views::not_found()))
}
