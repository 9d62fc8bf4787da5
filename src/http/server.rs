use super::state::HttpServerState;
use super::upload::{method_not_allowed, receive_upload};
use crate::config;
use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header;
use axum::routing::post;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace;
use tower_http::{ServiceBuilderExt, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{Level, error, info};

/// Routes shared by the server and the tests.
pub fn build_app_routes(state: HttpServerState, max_body_layer: DefaultBodyLimit) -> Router {
    Router::new()
        // Firmware images for over-the-air updates
        .nest_service("/fw", ServeDir::new(state.firmware_dir.as_path()))
        .route(
            "/api/{*path}",
            post(receive_upload)
                .get(method_not_allowed)
                .delete(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .layer(max_body_layer)
        .with_state(state)
}

/// Body limit for the upload route. Without a configured limit, any size
/// is accepted, including bodies above axum's 2 MB default.
pub fn body_limit_layer(limit: Option<usize>) -> DefaultBodyLimit {
    match limit {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    }
}

pub async fn run_http_server(state: HttpServerState, address: SocketAddr) -> Result<()> {
    let config = config::get()?;
    let max_body_layer = body_limit_layer(config.parse_http_body_limit()?);

    // List of headers that shouldn't be logged
    let sensitive_headers: Arc<[_]> = vec![header::AUTHORIZATION, header::COOKIE].into();

    let middleware = ServiceBuilder::new()
        .sensitive_request_headers(sensitive_headers.clone())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .sensitive_response_headers(sensitive_headers)
        .into_inner();

    let app = build_app_routes(state, max_body_layer).layer(middleware);
    let app = match config.http_server_timeout() {
        Some(timeout) => app.layer(TimeoutLayer::new(timeout)),
        None => app,
    };

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(%address, "Upload receiver listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", err);
    }
}
