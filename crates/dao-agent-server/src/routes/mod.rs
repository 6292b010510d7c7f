// Export route modules
pub mod agent;

use axum::http::StatusCode;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    // Answers OPTIONS on every path, matched or not
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(agent::routes(state))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
