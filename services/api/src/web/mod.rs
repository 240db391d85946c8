pub mod extract;
pub mod history;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rest::ApiDoc;
use state::AppState;

/// Largest accepted request body, sized for phone photos.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Builds the full application router: API routes, Swagger UI and request tracing.
/// CORS is layered on by the binary since it depends on deployment config.
pub fn router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/", get(rest::status_handler))
        .route("/api/extract", post(rest::extract_handler))
        .route("/api/calculate", post(rest::calculate_handler))
        .route("/api/chat", post(rest::chat_handler))
        .route("/api/dashboard/topics", get(rest::topics_handler))
        .route(
            "/api/history",
            post(history::save_history_handler).get(history::list_history_handler),
        )
        .route(
            "/api/history/{id}",
            get(history::get_history_handler).put(history::update_chat_handler),
        )
        .route("/api/history/{id}/chat", delete(history::clear_chat_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
