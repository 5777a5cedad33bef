mod directory;
mod enroll;
mod health;
mod metrics;
mod snapshot;
mod video_feed;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/video_feed", get(video_feed::video_feed))
        .route("/snapshot", post(snapshot::snapshot))
        .route("/enroll", post(enroll::enroll_face))
        .route("/employees", get(directory::employees))
        .route("/attendance", get(directory::attendance))
}
