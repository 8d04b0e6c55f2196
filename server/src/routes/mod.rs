pub mod assets;
pub mod jobs;
pub mod sources;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub const HEALTH_MESSAGE: &str = "Video Content Hub API.";

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(|| async { HEALTH_MESSAGE }))
        .merge(sources::routes())
        .merge(jobs::routes())
        .merge(assets::routes())
}
