use super::state::AppState;
use crate::handler::health::health_handler;
use crate::handler::not_found::not_found_handler;
use crate::middleware::log_request;
use axum::Router;
use axum::middleware;
use axum::routing::get;

/// Build the HTTP router; every request, including unknown routes, is logged.
pub fn main_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state, log_request))
}
