use crate::{server::SharedState, session::SessionState};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    session: String,
    backend: String,
}

pub async fn healthcheck(State(state): State<SharedState>) -> Json<Status> {
    let session = match state.session.state() {
        SessionState::Idle => "idle",
        SessionState::Capturing => "capturing",
    };
    Json(Status {
        status: "Available".into(),
        session: session.into(),
        backend: state.backend.base_url().to_string(),
    })
}
