pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/config", get(routes::get_config).post(routes::apply_config))
        .route("/api/densities", get(routes::list_densities))
        .route("/api/estimate", post(routes::estimate))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
