//! Router setup and server startup.

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use ghostwriter_core::{GhostwriterConfig, GhostwriterError};

use crate::handlers;
use crate::state::AppState;

/// Port the reviewer UI's dev server listens on.
const REVIEWER_DEV_PORT: u16 = 3000;

/// Build the router with every route and middleware layer.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [REVIEWER_DEV_PORT, port]
        .iter()
        .flat_map(|p| [format!("http://localhost:{}", p), format!("http://127.0.0.1:{}", p)])
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/queue", get(handlers::queue))
        .route("/ws/messaging", get(handlers::messaging_socket))
        .route("/ws/frontend", get(handlers::frontend_socket))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured port and serve until the listener fails.
pub async fn start_server(config: &GhostwriterConfig, state: AppState) -> Result<(), GhostwriterError> {
    let addr = format!("0.0.0.0:{}", config.general.port);
    let router = create_router(state);

    tracing::info!("Starting relay server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GhostwriterError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| GhostwriterError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
