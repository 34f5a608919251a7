use crate::api::handlers::{
    auth::{AuthState, flash::attach_flash_cookie, require_auth},
    pages,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{any, get},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
mod openapi;
pub mod views;

pub use openapi::openapi;

/// Full application router: public endpoints, gated portal pages and the 404 fallback.
#[must_use]
pub fn router(auth_state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/", get(pages::index))
        .route("/dashboard", get(pages::index))
        .route("/about", get(pages::about))
        .route("/dash-dashboard", get(pages::dash_dashboard))
        .route("/taipy-dashboard", get(pages::taipy_dashboard))
        .route("/dash/", any(pages::dashboard_app))
        .route("/dash/{*path}", any(pages::dashboard_app))
        .route("/taipy1/", any(pages::dashboard_app))
        .route("/taipy1/{*path}", any(pages::dashboard_app))
        .route("/taipy2/", any(pages::dashboard_app))
        .route("/taipy2/{*path}", any(pages::dashboard_app))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ));

    let (public, _openapi) = openapi::api_router().split_for_parts();

    public
        .merge(protected)
        .fallback(pages::not_found)
        .layer(middleware::map_response_with_state(
            auth_state.clone(),
            attach_flash_cookie,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CatchPanicLayer::custom(error::handle_panic))
                .layer(Extension(auth_state)),
        )
}

/// Bind the listener and serve until ctrl-c.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn new(port: u16, auth_state: Arc<AuthState>) -> Result<()> {
    let app = router(auth_state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
