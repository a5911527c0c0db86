//! HTTP/WebSocket router assembly.
//!
//! Merges the `/ws` upgrade path with the REST surface, applies the REST
//! rate limiter only to the REST sub-router (the socket transport has its
//! own, separately-keyed limiter), and layers CORS over the whole thing.

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    let rest = crate::rest::router().layer(from_fn_with_state(state.clone(), crate::rest::rate_limit));

    Router::new()
        .merge(crate::websocket::router())
        .merge(rest)
        .layer(cors)
        .with_state(state)
}

/// Exact-origin CORS with credentials when a specific origin is
/// configured; permissive, credential-less CORS for the default `*` (or
/// any value that isn't a valid header value).
fn cors_layer(origin: &str) -> CorsLayer {
    let methods = [Method::GET, Method::POST];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE];

    match (origin, HeaderValue::from_str(origin)) {
        ("*", _) | (_, Err(_)) => CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(headers),
        (_, Ok(value)) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use vidbridge_store::credentials::fake::InMemoryCredentialStore;
    use vidbridge_store::rooms::fake::InMemoryRoomStore;
    use vidbridge_store::TokenService;

    fn test_state() -> AppState {
        let tokens = TokenService::new("test-secret").unwrap();
        let config = RelayConfig {
            port: 3001,
            cors_origin: "*".to_string(),
            database_uri: "mongodb://localhost/test".to_string(),
            auth_secret: "test-secret".to_string(),
            log_level: "info".to_string(),
        };
        AppState::new(
            config,
            tokens.clone(),
            Arc::new(InMemoryCredentialStore::new(tokens)),
            Arc::new(InMemoryRoomStore::default()),
        )
    }

    #[tokio::test]
    async fn health_endpoint_is_reachable_through_the_merged_router() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[test]
    fn wildcard_origin_falls_back_to_permissive_cors() {
        // Exercised indirectly: a configured "*" must not panic when building
        // the layer (tower_http panics on invalid header values, not on Any).
        let _ = cors_layer("*");
    }

    #[test]
    fn exact_origin_builds_without_panicking() {
        let _ = cors_layer("https://example.com");
    }
}
