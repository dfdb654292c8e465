pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod schedules;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use rest::health_handler;
pub use state::AppState;

/// Builds the API router: `/health` is public, everything under `/schedules`
/// requires a bearer token.
pub fn api_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/health", get(health_handler));

    let protected_routes = Router::new()
        .route(
            "/schedules",
            post(schedules::create_schedule_handler).delete(schedules::delete_schedule_handler),
        )
        .route("/schedules/my-schedule", get(schedules::my_schedule_handler))
        .route("/schedules/progress", get(schedules::progress_handler))
        .route(
            "/schedules/complete-lesson",
            patch(schedules::complete_lesson_handler),
        )
        .route("/schedules/config", put(schedules::update_config_handler))
        .route("/schedules/reschedule", post(schedules::reschedule_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
