//! Route configuration and setup

use crate::auth::{whitelist_middleware, WhitelistState};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use gouvre_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let whitelist = Arc::new(WhitelistState::from_config(config)?);

    // Token-authorized routes: the token in the path is the credential
    let public_routes = Router::new()
        .route("/ping", get(handlers::ping::ping))
        .route("/links/{token}", get(handlers::links::get_link))
        .route("/uploads/{token}", put(handlers::uploads::upload_file));

    // Link-issuing routes require a whitelisted caller
    let protected_routes = Router::new()
        .route("/links", post(handlers::links::create_link))
        .route("/uploads", post(handlers::uploads::create_upload_link))
        .route(
            "/thumbnails",
            post(handlers::thumbnails::create_thumbnail_links),
        )
        .layer(axum::middleware::from_fn_with_state(
            whitelist,
            whitelist_middleware,
        ));

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = match std::env::var("HTTP_CONCURRENCY_LIMIT") {
        Ok(value) => value.trim().parse::<usize>().map_err(|_| {
            anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT has an invalid value '{}'", value)
        })?,
        Err(_) => 10_000,
    }
    .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        max_upload_size_bytes = config.max_upload_size_bytes,
        "HTTP limits configured"
    );

    let app = public_routes
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|_| anyhow::anyhow!("Invalid CORS origin: {}", o))
            })
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
