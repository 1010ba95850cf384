//! REST API Routes Module
//!
//! Route handlers stay thin: query parameters arrive validated through
//! [`QueryParams`](crate::extractors::QueryParams), the database handle
//! through [`AppState::documents`].
//!
//! Any path not listed here answers 404 with an empty body.

pub mod roots;
pub mod stub;
pub mod verses;
pub mod words;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::health;
use crate::middleware::flow_context;
use crate::state::AppState;

/// Unknown paths: 404, no body.
async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. Flow context - correlation id and request span
/// 2. TraceLayer - request/response logging inside that span
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/manage/health", get(health::health))
        .route("/stub", get(stub::stub))
        .route("/words/:language/:word", get(words::get_word).put(words::put_word))
        .route("/roots/:language/:root", get(roots::get_root))
        .route("/verses/:source", get(verses::list_verses))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(flow_context))
        .with_state(state)
}
