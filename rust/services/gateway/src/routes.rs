//! API routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::middleware::api_key_middleware;
use crate::state::AppState;

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    // Mutating and read routes carry the API key requirement.
    let api = Router::new()
        // Projects
        .route("/projects", post(handlers::projects::create_project))
        .route("/projects", get(handlers::projects::list_projects))
        // Plans
        .route(
            "/projects/{project_id}/plans",
            post(handlers::plans::create_plan),
        )
        // Runs
        .route(
            "/projects/{project_id}/runs",
            post(handlers::runs::create_run),
        )
        .route("/runs/{run_id}", get(handlers::runs::get_run))
        .route("/runs/{run_id}/approve", post(handlers::runs::approve_run))
        .route("/runs/{run_id}/cancel", post(handlers::runs::cancel_run))
        // Worker-side event ingress
        .route(
            "/internal/runs/{run_id}/events",
            post(handlers::events::post_run_event),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    // The WebSocket feed is a read-only subscription and skips the key check.
    let v1 = Router::new()
        .route("/ws/runs/{run_id}", get(handlers::ws::run_events_ws))
        .merge(api);

    Router::new()
        // Liveness and metrics (no auth required)
        .route("/healthz", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/v1", v1)
        .with_state(state)
}
