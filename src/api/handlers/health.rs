use crate::{GIT_COMMIT_HASH, api::handlers::auth::AuthState};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    negotiate: String,
    sessions: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Portal is healthy", body = [Health]),
        (status = 503, description = "Session store is unhealthy", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(Extension(auth_state): Extension<Arc<AuthState>>) -> impl IntoResponse {
    let sessions = match auth_state.sessions().active().await {
        Ok(count) => Ok(count),
        Err(err) => {
            error!("Failed to count sessions: {}", err);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        negotiate: auth_state.resolver().status().to_string(),
        sessions: sessions
            .as_ref()
            .map_or_else(|_| "error".to_string(), ToString::to_string),
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    // Unwrap the headers or provide a default value (empty headers) in case of an error
    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    let status = sessions.map_or_else(|status| status, |_| StatusCode::OK);

    (status, headers, Json(health))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{AuthConfig, DisabledResolver, MemorySessionStore};
    use axum::{Router, body::Body, body::to_bytes, http::Request, routing::get};
    use secrecy::SecretString;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_status() {
        let config = AuthConfig::new(SecretString::from("h".repeat(32)));
        let sessions = Arc::new(MemorySessionStore::new(
            config.secret_key().clone(),
            config.session_ttl(),
        ));
        let auth_state = Arc::new(AuthState::new(config, sessions, Arc::new(DisabledResolver)));

        let app = Router::new()
            .route("/health", get(health))
            .layer(Extension(auth_state));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get("X-App")
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.starts_with(env!("CARGO_PKG_NAME")))
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["negotiate"], "disabled");
        assert_eq!(payload["sessions"], "0");
        assert_eq!(payload["name"], env!("CARGO_PKG_NAME"));
    }
}
