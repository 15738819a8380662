use axum::{
    body::Body,
    http::Request,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Interactions
        .route("/interactions", post(handlers::record_interaction))
        .route("/interactions/batch", post(handlers::record_interaction_batch))
        // Ratings
        .route("/ratings", post(handlers::rate))
        .route("/ratings/:target_id", get(handlers::get_own_rating))
        .route("/targets/:target_id/rating", get(handlers::get_target_rating))
        // Recommendations
        .route("/recommendations", post(handlers::recommendations))
        // Preference scores
        .route("/preferences", get(handlers::get_preferences))
        // Privacy erasure
        .route("/me/data", delete(handlers::erase_user_data))
}

/// Span for each request, carrying a propagated or generated request id
fn make_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
