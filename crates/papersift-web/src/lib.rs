use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod models;
pub mod state;
pub mod upload;

pub use state::{AppState, SESSION_HEADER, SharedState, spawn_session_reaper};

/// Upload size cap for one multipart request.
const BODY_LIMIT_BYTES: usize = 100 * 1024 * 1024;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/api/ollama-refine-query",
            post(handlers::proxy::refine_query),
        )
        .route(
            "/api/ollama-summarize-abstract",
            post(handlers::proxy::summarize_abstract),
        )
        .route(
            "/api/files",
            post(handlers::files::upload).get(handlers::files::list),
        )
        .route("/api/files/{index}", delete(handlers::files::remove))
        .route("/api/queries", post(handlers::queries::generate))
        .route("/api/verbose-query", post(handlers::queries::generate_verbose))
        .route("/api/results/render", post(handlers::results::render))
        .route("/api/results/sort", post(handlers::results::sort))
        .route("/api/results/{index}/toggle", post(handlers::results::toggle))
        .route("/api/results/export/{format}", get(handlers::results::export))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
