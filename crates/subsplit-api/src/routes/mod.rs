//! API routes.

pub mod health;
pub mod hooks;

use crate::AppState;
use axum::Router;
use axum::routing::post;

/// Build the router: the push hook intake at `hook_route` plus health checks.
pub fn router(state: AppState, hook_route: &str) -> Router {
    Router::new()
        .route(hook_route, post(hooks::receive_hook))
        .merge(health::router())
        .with_state(state)
}
